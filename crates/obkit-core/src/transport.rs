//! Transport capabilities.
//!
//! Protocol engines depend only on these narrow traits; concrete
//! implementations live in `obkit-transport` and tests substitute in-memory
//! fakes.
//!
//! - [`HttpClient`] - one request in, status and body out
//! - [`WsConnector`] - opens [`WsConnection`]s to a URL with optional bearer auth

use std::fmt;

use async_trait::async_trait;

use crate::error::TransportResult;

// =============================================================================
// HTTP
// =============================================================================

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    #[default]
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Token sent as `Authorization: Bearer {token}`.
    pub bearer_token: Option<String>,
    /// JSON body, already serialized.
    pub json_body: Option<String>,
}

impl HttpRequest {
    /// Creates a request without auth or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer_token: None,
            json_body: None,
        }
    }

    /// Sets the bearer token.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: impl Into<String>) -> Self {
        self.json_body = Some(body.into());
        self
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body decoded as UTF-8 text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

// =============================================================================
// WebSocket
// =============================================================================

/// A frame received from a WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsFrame {
    /// Text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping frame.
    Ping(Vec<u8>),
    /// Pong frame.
    Pong(Vec<u8>),
    /// Close frame sent by the peer.
    Close(Option<CloseReason>),
}

/// Code and reason of a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Close code (RFC 6455 §7.4).
    pub code: u16,
    /// Human-readable reason.
    pub reason: String,
}

impl CloseReason {
    /// Normal closure (1000).
    pub const NORMAL: u16 = 1000;
    /// Internal error (1011).
    pub const INTERNAL_ERROR: u16 = 1011;

    /// Creates a close reason.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Creates an internal-error close reason.
    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, reason)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.reason)
    }
}

/// A live WebSocket connection.
#[async_trait]
pub trait WsConnection: Send {
    /// Receives the next frame.
    ///
    /// Returns `None` once the connection is closed. An error for which
    /// [`TransportError::is_closed`](crate::TransportError::is_closed) is
    /// `false` only affects the current frame.
    async fn receive(&mut self) -> Option<TransportResult<WsFrame>>;

    /// Sends a text frame.
    async fn send_text(&mut self, text: String) -> TransportResult<()>;

    /// Sends a binary frame.
    async fn send_binary(&mut self, data: Vec<u8>) -> TransportResult<()>;

    /// Performs the closing handshake, with or without a reason.
    async fn close(&mut self, reason: Option<CloseReason>) -> TransportResult<()>;

    /// Drops the underlying stream without a closing handshake.
    fn terminate(&mut self);

    /// Returns `true` while the connection can still be used.
    fn is_active(&self) -> bool;
}

/// Opens WebSocket connections.
#[async_trait]
pub trait WsConnector: Send + Sync {
    /// Connects to `url`, sending `Authorization: Bearer {token}` when given.
    async fn connect(
        &self,
        url: &str,
        bearer_token: Option<&str>,
    ) -> TransportResult<Box<dyn WsConnection>>;
}
