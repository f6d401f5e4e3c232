//! In-memory transports and fixtures for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use obkit_core::{
    CloseReason, EventDispatcher, HttpClient, HttpRequest, HttpResponse, TransportError,
    TransportResult, WsConnection, WsConnector, WsFrame,
};

use crate::bot::{OneBotBot, OneBotBotBuilder};
use crate::config::OneBotBotConfig;

// ============================================================================
// HTTP
// ============================================================================

/// Records requests and answers them from a queue, then from fixed routes.
#[derive(Default)]
pub(crate) struct MockHttpClient {
    queue: Mutex<VecDeque<HttpResponse>>,
    routes: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a response for the next request.
    pub(crate) fn respond(&self, status: u16, body: &str) {
        self.queue.lock().push_back(HttpResponse {
            status,
            body: body.to_owned(),
        });
    }

    /// Answers every request to `{host}/{action}` with `body`.
    pub(crate) fn route(&self, action: &str, body: &str) {
        self.routes.lock().insert(
            action.to_owned(),
            HttpResponse {
                status: 200,
                body: body.to_owned(),
            },
        );
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL ends with `/{action}`.
    pub(crate) fn requests_to(&self, action: &str) -> Vec<HttpRequest> {
        let suffix = format!("/{action}");
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(&suffix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        self.requests.lock().push(request.clone());
        if let Some(response) = self.queue.lock().pop_front() {
            return Ok(response);
        }
        let action = request.url.rsplit('/').next().unwrap_or_default();
        self.routes
            .lock()
            .get(action)
            .cloned()
            .ok_or_else(|| TransportError::ConnectionFailed {
                url: request.url.clone(),
                reason: "no mock response".into(),
            })
    }
}

// ============================================================================
// WebSocket
// ============================================================================

/// Observes what happened to one mock connection.
#[derive(Default)]
pub(crate) struct ConnectionProbe {
    close_reason: Mutex<Option<Option<CloseReason>>>,
    terminated: AtomicBool,
    hang_on_close: AtomicBool,
}

impl ConnectionProbe {
    /// `Some(reason)` once `close` was called.
    pub(crate) fn close_reason(&self) -> Option<Option<CloseReason>> {
        self.close_reason.lock().clone()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Makes `close` never complete.
    pub(crate) fn hang_on_close(&self) {
        self.hang_on_close.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct MockWsConnection {
    frames: VecDeque<WsFrame>,
    hold_open: bool,
    active: bool,
    probe: Arc<ConnectionProbe>,
}

#[async_trait]
impl WsConnection for MockWsConnection {
    async fn receive(&mut self) -> Option<TransportResult<WsFrame>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        self.active = false;
        None
    }

    async fn send_text(&mut self, _text: String) -> TransportResult<()> {
        Ok(())
    }

    async fn send_binary(&mut self, _data: Vec<u8>) -> TransportResult<()> {
        Ok(())
    }

    async fn close(&mut self, reason: Option<CloseReason>) -> TransportResult<()> {
        if self.probe.hang_on_close.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.active = false;
        *self.probe.close_reason.lock() = Some(reason);
        Ok(())
    }

    fn terminate(&mut self) {
        self.active = false;
        self.probe.terminated.store(true, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Hands out scripted connections; fails once the script is exhausted.
#[derive(Default)]
pub(crate) struct MockWsConnector {
    script: Mutex<VecDeque<Option<MockWsConnection>>>,
    attempts: AtomicU32,
    tokens: Mutex<Vec<Option<String>>>,
}

impl MockWsConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_once(&self) {
        self.script.lock().push_back(None);
    }

    /// Accepts a connection that delivers `frames`, then reports closed.
    pub(crate) fn accept(&self, frames: Vec<WsFrame>) -> Arc<ConnectionProbe> {
        self.push(frames, false)
    }

    /// Accepts a connection that delivers `frames`, then stays open.
    pub(crate) fn accept_and_hold(&self, frames: Vec<WsFrame>) -> Arc<ConnectionProbe> {
        self.push(frames, true)
    }

    fn push(&self, frames: Vec<WsFrame>, hold_open: bool) -> Arc<ConnectionProbe> {
        let probe = Arc::new(ConnectionProbe::default());
        self.script.lock().push_back(Some(MockWsConnection {
            frames: frames.into(),
            hold_open,
            active: true,
            probe: probe.clone(),
        }));
        probe
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Bearer tokens of every attempt.
    pub(crate) fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl WsConnector for MockWsConnector {
    async fn connect(
        &self,
        url: &str,
        bearer_token: Option<&str>,
    ) -> TransportResult<Box<dyn WsConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().push(bearer_token.map(str::to_owned));
        match self.script.lock().pop_front().flatten() {
            Some(connection) => Ok(Box::new(connection)),
            None => Err(TransportError::ConnectionFailed {
                url: url.to_owned(),
                reason: "connection refused".into(),
            }),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub(crate) const LOGIN_INFO: &str =
    r#"{"retcode":0,"status":"ok","data":{"user_id":10,"nickname":"obkit"}}"#;

pub(crate) fn test_config() -> OneBotBotConfig {
    OneBotBotConfig {
        bot_unique_id: "test".into(),
        api_server_host: "http://gw".into(),
        ..Default::default()
    }
}

/// Builder for a bot without event channel, backed by a fresh mock HTTP
/// client and dispatcher.
pub(crate) fn test_bot() -> OneBotBotBuilder {
    test_bot_with(MockHttpClient::new(), Arc::new(EventDispatcher::new()))
}

pub(crate) fn test_bot_with(
    http: Arc<MockHttpClient>,
    dispatcher: Arc<EventDispatcher>,
) -> OneBotBotBuilder {
    OneBotBot::builder(test_config(), http).event_bus(dispatcher)
}

/// Polls `condition` until it holds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
