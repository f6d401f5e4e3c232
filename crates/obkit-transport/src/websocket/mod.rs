//! WebSocket transport capabilities.

mod client;

pub use client::TungsteniteConnector;
