//! HTTP transport capabilities.

mod client;

pub use client::{HttpClientOptions, ReqwestHttpClient};
