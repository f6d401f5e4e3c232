//! # obkit Transport
//!
//! Concrete implementations of the transport capabilities defined in
//! `obkit-core`, selected through feature flags.
//!
//! ## Features
//!
//! - `http-client`: [`ReqwestHttpClient`], an [`HttpClient`](obkit_core::HttpClient) backed by reqwest
//! - `ws-client`: [`TungsteniteConnector`], a [`WsConnector`](obkit_core::WsConnector) backed by tokio-tungstenite
//! - `full`: both
//!
//! ```text
//! ┌─────────────────────┐
//! │  Adapter Layer      │  (OneBot, ...)
//! │  (uses capabilities)│
//! ├─────────────────────┤
//! │  obkit-core         │  (capability traits)
//! ├─────────────────────┤
//! │  obkit-transport    │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use obkit_transport::{ReqwestHttpClient, TungsteniteConnector};
//!
//! let http = Arc::new(ReqwestHttpClient::new()?);
//! let ws = Arc::new(TungsteniteConnector::new());
//! ```

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "ws-client")]
pub mod websocket;

#[cfg(feature = "http-client")]
pub use http::{HttpClientOptions, ReqwestHttpClient};

#[cfg(feature = "ws-client")]
pub use websocket::TungsteniteConnector;
