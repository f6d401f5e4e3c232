//! WebSocket client capability implementation.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};

use obkit_core::{
    CloseReason, TransportError, TransportResult, WsConnection, WsConnector, WsFrame,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`WsConnector`] backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Creates a new connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WsConnector for TungsteniteConnector {
    async fn connect(
        &self,
        url: &str,
        bearer_token: Option<&str>,
    ) -> TransportResult<Box<dyn WsConnection>> {
        let connection_failed = |reason: String| TransportError::ConnectionFailed {
            url: url.to_string(),
            reason,
        };

        let mut request = url
            .into_client_request()
            .map_err(|e| connection_failed(format!("invalid request: {e}")))?;
        if let Some(token) = bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| connection_failed(format!("invalid access token: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        info!(url = %url, "Connecting to WebSocket server");

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| connection_failed(format!("WebSocket connection failed: {e}")))?;

        info!(url = %url, "WebSocket client connected");

        Ok(Box::new(TungsteniteConnection {
            stream,
            active: true,
        }))
    }
}

/// A single tokio-tungstenite connection.
struct TungsteniteConnection {
    stream: WsStream,
    active: bool,
}

impl TungsteniteConnection {
    fn map_error(&mut self, err: WsError) -> TransportError {
        match err {
            WsError::Capacity(e) => TransportError::InvalidFrame(e.to_string()),
            other => {
                self.active = false;
                TransportError::closed(other.to_string())
            }
        }
    }
}

#[async_trait]
impl WsConnection for TungsteniteConnection {
    async fn receive(&mut self) -> Option<TransportResult<WsFrame>> {
        if !self.active {
            return None;
        }

        let frame = match self.stream.next().await? {
            Ok(Message::Text(text)) => WsFrame::Text(text.as_str().to_owned()),
            Ok(Message::Binary(data)) => WsFrame::Binary(data.to_vec()),
            Ok(Message::Ping(data)) => WsFrame::Ping(data.to_vec()),
            Ok(Message::Pong(data)) => WsFrame::Pong(data.to_vec()),
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Server closed connection");
                self.active = false;
                WsFrame::Close(
                    frame.map(|f| CloseReason::new(u16::from(f.code), f.reason.as_str().to_owned())),
                )
            }
            Ok(Message::Frame(_)) => {
                trace!("Skipping raw frame");
                return Some(Err(TransportError::InvalidFrame("raw frame".into())));
            }
            Err(e) => return Some(Err(self.map_error(e))),
        };

        Some(Ok(frame))
    }

    async fn send_text(&mut self, text: String) -> TransportResult<()> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn send_binary(&mut self, data: Vec<u8>) -> TransportResult<()> {
        self.stream
            .send(Message::Binary(data.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self, reason: Option<CloseReason>) -> TransportResult<()> {
        let frame = reason.map(|r| CloseFrame {
            code: CloseCode::from(r.code),
            reason: r.reason.into(),
        });
        self.active = false;
        match self.stream.close(frame).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::closed(e.to_string())),
        }
    }

    fn terminate(&mut self) {
        // Dropping the stream afterwards releases the socket; until then no
        // further reads are attempted.
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        let connector = TungsteniteConnector::new();
        let err = match connector.connect("ws://127.0.0.1:9/", Some("token")).await {
            Ok(_) => panic!("connection to a closed port succeeded"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let connector = TungsteniteConnector::new();
        let err = match connector.connect("not a url", None).await {
            Ok(_) => panic!("invalid url accepted"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("not a url"));
    }
}
