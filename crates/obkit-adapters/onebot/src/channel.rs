//! Reconnecting event channel.
//!
//! Keeps at most one WebSocket connection to the event server open and hands
//! every text or binary frame to a [`FrameHandler`], in arrival order.
//! Frames are resolved inside the read loop; their deliveries run one after
//! another on a separate task of the session, so a slow listener never holds
//! up reading or session replacement.
//!
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!          ▼                                              │
//!      connect ──fail──▶ retries left? ──yes──▶ sleep ────┘
//!          │                   │ no
//!          │ ok                ▼
//!          ▼            fail bot (ConnectRetriesExhausted)
//!      read frames ──fatal payload──▶ close(1011) ──▶ fail bot
//!          │ closed
//!          ▼
//!      close (5s, then terminate) ──▶ back to connect
//! ```
//!
//! A session runs as a task of the bot [`Lifecycle`]; cancelling the bot,
//! or replacing the session with [`EventChannel::start`], stops the connect
//! loop and the read loop together.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use obkit_core::{CloseReason, WsConnection, WsConnector, WsFrame};

use crate::error::{BotError, BotResult, ResolveError};
use crate::lifecycle::Lifecycle;

/// Bound on the closing handshake before the connection is dropped.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deferred delivery of one resolved frame.
pub(crate) type Dispatch = BoxFuture<'static, ()>;

/// Consumer of received frames.
pub(crate) trait FrameHandler: Send + Sync {
    /// Resolves one frame decoded as UTF-8 text into its delivery.
    ///
    /// A fatal [`ResolveError`] terminates the bot.
    fn handle_frame(&self, text: String) -> Result<Dispatch, ResolveError>;
}

/// Connection parameters of an [`EventChannel`].
#[derive(Debug, Clone)]
pub(crate) struct ChannelOptions {
    pub url: String,
    pub access_token: Option<String>,
    /// `0` retries forever.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

struct Session {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub(crate) struct EventChannel {
    connector: Arc<dyn WsConnector>,
    options: Arc<ChannelOptions>,
    handler: Arc<dyn FrameHandler>,
    lifecycle: Arc<Lifecycle>,
    session: Mutex<Option<Session>>,
}

impl EventChannel {
    pub(crate) fn new(
        connector: Arc<dyn WsConnector>,
        options: ChannelOptions,
        handler: Arc<dyn FrameHandler>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            connector,
            options: Arc::new(options),
            handler,
            lifecycle,
            session: Mutex::new(None),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.options.url
    }

    /// Replaces the current session with a new one.
    ///
    /// Returns once the previous session has closed its connection; the new
    /// session connects in the background. Deliveries the previous session
    /// already queued still run.
    pub(crate) async fn start(&self) -> BotResult<()> {
        let mut session = self.session.lock().await;
        if let Some(previous) = session.take() {
            debug!(url = %self.options.url, "Replacing event channel session");
            stop_session(previous).await;
        }
        if self.lifecycle.is_cancelled() {
            return Err(BotError::Cancelled);
        }

        let token = self.lifecycle.token().child_token();
        let runner = SessionRunner {
            connector: self.connector.clone(),
            options: self.options.clone(),
            handler: self.handler.clone(),
            lifecycle: self.lifecycle.clone(),
            token: token.clone(),
        };
        let handle = self.lifecycle.spawn(runner.run());
        *session = Some(Session { token, handle });
        Ok(())
    }

    /// Stops the current session, if any. Idempotent.
    pub(crate) async fn stop(&self) {
        if let Some(previous) = self.session.lock().await.take() {
            stop_session(previous).await;
        }
    }
}

async fn stop_session(session: Session) {
    session.token.cancel();
    if let Err(e) = session.handle.await {
        warn!(error = %e, "Event channel session task failed");
    }
}

// ============================================================================
// Session
// ============================================================================

enum ReadOutcome {
    Closed,
    Cancelled,
    Fatal(ResolveError),
}

struct SessionRunner {
    connector: Arc<dyn WsConnector>,
    options: Arc<ChannelOptions>,
    handler: Arc<dyn FrameHandler>,
    lifecycle: Arc<Lifecycle>,
    token: CancellationToken,
}

impl SessionRunner {
    async fn run(self) {
        let url = self.options.url.as_str();
        let mut attempts = 0u32;

        let (dispatches, queue) = mpsc::unbounded_channel();
        self.lifecycle
            .spawn(deliver_in_order(queue, self.lifecycle.token().clone()));

        while !self.token.is_cancelled() {
            attempts += 1;
            debug!(url = %url, attempt = attempts, "Connecting to event server");

            let connected = tokio::select! {
                result = self.connector.connect(url, self.options.access_token.as_deref()) => result,
                () = self.token.cancelled() => break,
            };

            let mut connection = match connected {
                Ok(connection) => connection,
                Err(e) => {
                    if self.options.max_retries > 0 && attempts > self.options.max_retries {
                        error!(
                            url = %url,
                            attempts = attempts,
                            error = %e,
                            "Giving up connecting to event server"
                        );
                        self.lifecycle.fail(BotError::ConnectRetriesExhausted {
                            url: url.to_owned(),
                            attempts,
                            last_error: e,
                        });
                        break;
                    }

                    warn!(
                        url = %url,
                        attempt = attempts,
                        error = %e,
                        delay = ?self.options.retry_delay,
                        "Failed to connect to event server, retrying"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(self.options.retry_delay) => continue,
                        () = self.token.cancelled() => break,
                    }
                }
            };

            attempts = 0;
            info!(url = %url, "Connected to event server");

            match self.read_frames(connection.as_mut(), &dispatches).await {
                ReadOutcome::Closed => {
                    info!(url = %url, "Event server connection closed");
                    close_connection(connection, None).await;
                }
                ReadOutcome::Cancelled => {
                    debug!(url = %url, "Event channel session cancelled");
                    close_connection(connection, None).await;
                    break;
                }
                ReadOutcome::Fatal(err) => {
                    let reason = CloseReason::internal_error("failed to resolve event");
                    close_connection(connection, Some(reason)).await;
                    self.lifecycle.fail(BotError::Resolve(err));
                    break;
                }
            }
        }

        debug!(url = %url, "Event channel session finished");
    }

    async fn read_frames(
        &self,
        connection: &mut dyn WsConnection,
        dispatches: &mpsc::UnboundedSender<Dispatch>,
    ) -> ReadOutcome {
        loop {
            let frame = tokio::select! {
                frame = connection.receive() => frame,
                () = self.token.cancelled() => return ReadOutcome::Cancelled,
            };

            let text = match frame {
                None => return ReadOutcome::Closed,
                Some(Err(e)) if e.is_closed() => {
                    debug!(error = %e, "Event connection reported closed");
                    return ReadOutcome::Closed;
                }
                Some(Err(e)) => {
                    debug!(error = %e, "Skipping unreadable frame");
                    continue;
                }
                Some(Ok(WsFrame::Text(text))) => text,
                Some(Ok(WsFrame::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
                Some(Ok(WsFrame::Close(reason))) => {
                    debug!(reason = ?reason, "Received close frame");
                    return ReadOutcome::Closed;
                }
                Some(Ok(_)) => {
                    trace!("Skipping control frame");
                    continue;
                }
            };

            trace!(len = text.len(), "Received raw event");
            match self.handler.handle_frame(text) {
                Ok(dispatch) => {
                    if dispatches.send(dispatch).is_err() {
                        debug!("Event delivery stopped, dropping event");
                    }
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, "Received an untrusted event payload, closing session");
                    return ReadOutcome::Fatal(err);
                }
                Err(err) => debug!(error = %err, "Event frame was not resolved"),
            }
        }
    }
}

/// Runs queued deliveries one at a time until the session drops its sender.
///
/// Bot termination abandons the delivery in progress.
async fn deliver_in_order(mut queue: mpsc::UnboundedReceiver<Dispatch>, token: CancellationToken) {
    loop {
        let dispatch = tokio::select! {
            dispatch = queue.recv() => match dispatch {
                Some(dispatch) => dispatch,
                None => break,
            },
            () = token.cancelled() => break,
        };
        tokio::select! {
            () = dispatch => {}
            () = token.cancelled() => {
                debug!("Event delivery cancelled");
                break;
            }
        }
    }
    trace!("Event delivery finished");
}

/// Closes gracefully within [`CLOSE_TIMEOUT`], terminating otherwise.
async fn close_connection(mut connection: Box<dyn WsConnection>, reason: Option<CloseReason>) {
    if !connection.is_active() {
        return;
    }
    match tokio::time::timeout(CLOSE_TIMEOUT, connection.close(reason)).await {
        Ok(Ok(())) => trace!("Event connection closed gracefully"),
        Ok(Err(e)) => {
            debug!(error = %e, "Closing event connection failed, terminating");
            connection.terminate();
        }
        Err(_) => {
            warn!(timeout = ?CLOSE_TIMEOUT, "Closing event connection timed out, terminating");
            connection.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex as SyncMutex;
    use tokio::time::Instant;

    use super::*;
    use crate::testing::{MockWsConnector, wait_until};

    const SLOW_DELIVERY: Duration = Duration::from_secs(5);

    /// Records resolved frames at once and delivered frames when their
    /// delivery ran. Frames starting with `slow` take [`SLOW_DELIVERY`].
    #[derive(Default)]
    struct RecordingHandler {
        resolved: SyncMutex<Vec<String>>,
        delivered: Arc<SyncMutex<Vec<String>>>,
    }

    impl RecordingHandler {
        fn delivered(&self) -> Vec<String> {
            self.delivered.lock().clone()
        }
    }

    impl FrameHandler for RecordingHandler {
        fn handle_frame(&self, text: String) -> Result<Dispatch, ResolveError> {
            if text == "fatal" {
                return Err(ResolveError::MissingPostType);
            }
            self.resolved.lock().push(text.clone());
            let delivered = self.delivered.clone();
            Ok(Box::pin(async move {
                if text.starts_with("slow") {
                    tokio::time::sleep(SLOW_DELIVERY).await;
                }
                delivered.lock().push(text);
            }))
        }
    }

    fn channel(
        connector: Arc<MockWsConnector>,
        max_retries: u32,
    ) -> (EventChannel, Arc<RecordingHandler>, Arc<Lifecycle>) {
        let handler = Arc::new(RecordingHandler::default());
        let lifecycle = Arc::new(Lifecycle::new());
        let options = ChannelOptions {
            url: "ws://gw/event".into(),
            access_token: Some("secret".into()),
            max_retries,
            retry_delay: Duration::from_millis(3500),
        };
        let channel = EventChannel::new(connector, options, handler.clone(), lifecycle.clone());
        (channel, handler, lifecycle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_fails_bot() {
        let connector = MockWsConnector::new();
        let (channel, _, lifecycle) = channel(connector.clone(), 2);

        let started = Instant::now();
        channel.start().await.unwrap();
        let err = lifecycle.join().await.unwrap_err();

        assert_eq!(connector.attempts(), 3);
        assert!(matches!(
            *err,
            BotError::ConnectRetriesExhausted { attempts: 3, .. }
        ));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(7000));
        assert!(elapsed < Duration::from_millis(10500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_retries_until_cancelled() {
        let connector = MockWsConnector::new();
        let (channel, _, lifecycle) = channel(connector.clone(), 0);

        channel.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(connector.attempts() > 10);
        assert!(lifecycle.failure().is_none());

        lifecycle.cancel();
        assert!(lifecycle.join().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_in_order_then_reconnect() {
        let connector = MockWsConnector::new();
        connector.fail_once();
        let first = connector.accept(vec![
            WsFrame::Text("a".into()),
            WsFrame::Ping(vec![]),
            WsFrame::Binary(b"b".to_vec()),
            WsFrame::Text("c".into()),
        ]);
        let second = connector.accept_and_hold(vec![WsFrame::Text("d".into())]);
        let (channel, handler, lifecycle) = channel(connector.clone(), 3);

        channel.start().await.unwrap();
        wait_until(|| handler.delivered().len() == 4).await;
        assert_eq!(handler.delivered(), ["a", "b", "c", "d"]);
        assert_eq!(connector.attempts(), 3);
        assert_eq!(connector.tokens()[0].as_deref(), Some("secret"));
        assert!(first.close_reason().is_none());

        lifecycle.cancel();
        lifecycle.join().await.unwrap();
        assert_eq!(second.close_reason(), Some(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_frame_closes_with_internal_error() {
        let connector = MockWsConnector::new();
        let probe = connector.accept_and_hold(vec![
            WsFrame::Text("ok".into()),
            WsFrame::Text("fatal".into()),
            WsFrame::Text("never".into()),
        ]);
        let (channel, handler, lifecycle) = channel(connector.clone(), 0);

        channel.start().await.unwrap();
        let err = lifecycle.join().await.unwrap_err();

        assert!(matches!(*err, BotError::Resolve(ResolveError::MissingPostType)));
        assert_eq!(*handler.resolved.lock(), ["ok"]);
        let reason = probe.close_reason().flatten().unwrap();
        assert_eq!(reason.code, CloseReason::INTERNAL_ERROR);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_session() {
        let connector = MockWsConnector::new();
        let first = connector.accept_and_hold(vec![]);
        let second = connector.accept_and_hold(vec![]);
        let (channel, _, lifecycle) = channel(connector.clone(), 0);

        channel.start().await.unwrap();
        wait_until(|| connector.attempts() == 1).await;
        channel.start().await.unwrap();
        assert_eq!(first.close_reason(), Some(None));

        wait_until(|| connector.attempts() == 2).await;
        assert!(second.close_reason().is_none());

        channel.stop().await;
        channel.stop().await;
        assert_eq!(second.close_reason(), Some(None));
        assert!(lifecycle.failure().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_wait_for_slow_delivery() {
        let connector = MockWsConnector::new();
        let first = connector.accept_and_hold(vec![
            WsFrame::Text("slow".into()),
            WsFrame::Text("after".into()),
        ]);
        connector.accept_and_hold(vec![]);
        let (channel, handler, lifecycle) = channel(connector.clone(), 0);

        channel.start().await.unwrap();
        wait_until(|| handler.resolved.lock().len() == 2).await;

        let restarted = Instant::now();
        channel.start().await.unwrap();
        assert!(restarted.elapsed() < SLOW_DELIVERY);
        assert!(handler.delivered().is_empty());
        assert_eq!(first.close_reason(), Some(None));

        wait_until(|| handler.delivered().len() == 2).await;
        assert_eq!(handler.delivered(), ["slow", "after"]);
        assert_eq!(connector.attempts(), 2);

        lifecycle.cancel();
        assert!(lifecycle.join().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_abandons_slow_delivery() {
        let connector = MockWsConnector::new();
        connector.accept_and_hold(vec![
            WsFrame::Text("slow".into()),
            WsFrame::Text("after".into()),
        ]);
        let (channel, handler, lifecycle) = channel(connector.clone(), 0);

        channel.start().await.unwrap();
        wait_until(|| handler.resolved.lock().len() == 2).await;

        let cancelled = Instant::now();
        lifecycle.cancel();
        assert!(lifecycle.join().await.is_ok());
        assert!(cancelled.elapsed() < SLOW_DELIVERY);
        assert!(handler.delivered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_cancel_is_rejected() {
        let connector = MockWsConnector::new();
        let (channel, _, lifecycle) = channel(connector.clone(), 0);
        lifecycle.cancel();
        assert!(matches!(channel.start().await, Err(BotError::Cancelled)));
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_close_is_terminated() {
        let connector = MockWsConnector::new();
        let probe = connector.accept_and_hold(vec![]);
        probe.hang_on_close();
        let (channel, _, lifecycle) = channel(connector.clone(), 0);

        channel.start().await.unwrap();
        wait_until(|| connector.attempts() == 1).await;
        lifecycle.cancel();
        lifecycle.join().await.unwrap();
        assert!(probe.is_terminated());
    }
}
