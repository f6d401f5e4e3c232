//! The OneBot bot handle.
//!
//! [`OneBotBot`] ties the engine together: it owns the [`ActionClient`], the
//! [`EventResolver`], the optional event channel and the lifecycle scope all
//! of its background tasks run in. It is a cheap, cloneable handle.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use obkit_adapter_onebot::{OneBotBot, OneBotBotConfig, SendSupport};
//! use obkit_core::EventDispatcher;
//!
//! let dispatcher = Arc::new(EventDispatcher::new());
//! let config = OneBotBotConfig::new("main")
//!     .event_server_host("ws://127.0.0.1:3002")
//!     .access_token("secret");
//!
//! let bot = OneBotBot::builder(config, http_client)
//!     .ws_connector(ws_connector)
//!     .event_bus(dispatcher.clone())
//!     .build();
//!
//! bot.start().await?;
//! bot.group(123456).send("hello").await?;
//! bot.join().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::StreamExt;
use futures::future::ready;
use futures::stream::BoxStream;
use obkit_core::{
    BoxedEvent, EventBus, EventDispatcher, EventResult, HttpClient, WsConnector,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::actor::{OneBotFriend, OneBotGroup, OneBotMember};
use crate::api::{Action, ActionClient, ActionResult, LoginInfo, actions};
use crate::channel::{ChannelOptions, Dispatch, EventChannel, FrameHandler};
use crate::codec::{SegmentCodec, SegmentRegistry};
use crate::config::OneBotBotConfig;
use crate::error::{BotError, BotResult, ResolveError};
use crate::event::BotStartedEvent;
use crate::interaction::MessageContent;
use crate::lifecycle::Lifecycle;
use crate::model::segment::CustomSegment;
use crate::resolver::{
    CustomEventResolver, EventResolver, FnResolver, RawEventRegistry, ResolverContext,
};

// ============================================================================
// Brand
// ============================================================================

/// Gateway implementation, detected from `get_version_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OneBotBrand {
    LLOneBot,
    Lagrange,
    #[default]
    Unknown,
}

impl OneBotBrand {
    /// Classifies an `app_name`, case-insensitively.
    pub fn from_app_name(app_name: &str) -> Self {
        let name = app_name.to_lowercase();
        if name.contains("llonebot") {
            Self::LLOneBot
        } else if name.contains("lagrange") {
            Self::Lagrange
        } else {
            Self::Unknown
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder returned by [`OneBotBot::builder`].
pub struct OneBotBotBuilder {
    config: OneBotBotConfig,
    http: Arc<dyn HttpClient>,
    ws_connector: Option<Arc<dyn WsConnector>>,
    event_bus: Option<Arc<dyn EventBus>>,
    segments: SegmentRegistry,
    raw_events: RawEventRegistry,
    custom_resolvers: Vec<Arc<dyn CustomEventResolver>>,
}

impl OneBotBotBuilder {
    /// Connector for the event channel. Required when
    /// `event_server_host` is set.
    pub fn ws_connector(mut self, connector: Arc<dyn WsConnector>) -> Self {
        self.ws_connector = Some(connector);
        self
    }

    /// Destination of every event. Defaults to a fresh [`EventDispatcher`].
    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Replaces the segment registry.
    pub fn segment_registry(mut self, registry: SegmentRegistry) -> Self {
        self.segments = registry;
        self
    }

    /// Registers a host-defined segment type.
    pub fn segment<T>(mut self, tag: impl Into<String>) -> Self
    where
        T: CustomSegment + DeserializeOwned,
    {
        self.segments.register::<T>(tag);
        self
    }

    /// Replaces the standard raw event registry.
    pub fn raw_event_registry(mut self, registry: RawEventRegistry) -> Self {
        self.raw_events = registry;
        self
    }

    /// Appends a custom event resolver to the chain.
    pub fn custom_resolver(mut self, resolver: impl CustomEventResolver + 'static) -> Self {
        self.custom_resolvers.push(Arc::new(resolver));
        self
    }

    /// Appends a closure to the custom resolver chain.
    pub fn custom_resolver_fn<F>(self, f: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> anyhow::Result<Option<BoxedEvent>> + Send + Sync + 'static,
    {
        self.custom_resolver(FnResolver::new(f))
    }

    pub fn build(self) -> OneBotBot {
        let actions = ActionClient::new(
            self.http,
            self.config.api_server_host.clone(),
            self.config.api_access_token.clone(),
        );
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| Arc::new(EventDispatcher::new()));
        let lifecycle = Arc::new(Lifecycle::new());
        let ws_connector = self.ws_connector;
        let config = self.config;

        let inner = Arc::new_cyclic(|weak: &Weak<BotInner>| {
            let channel = match (&config.event_server_host, ws_connector) {
                (Some(url), Some(connector)) => Some(EventChannel::new(
                    connector,
                    ChannelOptions {
                        url: url.clone(),
                        access_token: config.event_access_token.clone(),
                        max_retries: config.ws_connect_max_retry_times,
                        retry_delay: config.retry_delay(),
                    },
                    Arc::new(BotFrameHandler { bot: weak.clone() }),
                    lifecycle.clone(),
                )),
                _ => None,
            };

            BotInner {
                actions,
                event_bus,
                codec: SegmentCodec::new(self.segments),
                resolver: EventResolver::new(self.raw_events, self.custom_resolvers),
                channel,
                lifecycle,
                start_lock: Mutex::new(()),
                started: AtomicBool::new(false),
                login_info: RwLock::new(None),
                brand: RwLock::new(OneBotBrand::Unknown),
                config,
            }
        });

        OneBotBot { inner }
    }
}

// ============================================================================
// OneBotBot
// ============================================================================

struct BotInner {
    config: OneBotBotConfig,
    actions: ActionClient,
    event_bus: Arc<dyn EventBus>,
    codec: SegmentCodec,
    resolver: EventResolver,
    channel: Option<EventChannel>,
    lifecycle: Arc<Lifecycle>,
    start_lock: Mutex<()>,
    started: AtomicBool,
    login_info: RwLock<Option<LoginInfo>>,
    brand: RwLock<OneBotBrand>,
}

impl Drop for BotInner {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}

/// A OneBot v11 bot.
#[derive(Clone)]
pub struct OneBotBot {
    inner: Arc<BotInner>,
}

impl OneBotBot {
    pub fn builder(config: OneBotBotConfig, http: Arc<dyn HttpClient>) -> OneBotBotBuilder {
        OneBotBotBuilder {
            config,
            http,
            ws_connector: None,
            event_bus: None,
            segments: SegmentRegistry::standard(),
            raw_events: RawEventRegistry::standard(),
            custom_resolvers: Vec::new(),
        }
    }

    /// The configured `bot_unique_id`.
    pub fn id(&self) -> &str {
        &self.inner.config.bot_unique_id
    }

    pub fn config(&self) -> &OneBotBotConfig {
        &self.inner.config
    }

    pub fn codec(&self) -> &SegmentCodec {
        &self.inner.codec
    }

    pub fn resolver(&self) -> &EventResolver {
        &self.inner.resolver
    }

    pub fn actions(&self) -> &ActionClient {
        &self.inner.actions
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.inner.event_bus
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Starts the bot, or restarts its event channel.
    ///
    /// Refreshes the login info, starts the event channel in the background
    /// when `event_server_host` is set, and detects the gateway brand. The
    /// first successful start pushes a [`BotStartedEvent`].
    pub async fn start(&self) -> BotResult<()> {
        let _guard = self.inner.start_lock.lock().await;
        if self.inner.lifecycle.is_cancelled() {
            return Err(BotError::Cancelled);
        }
        self.inner.config.validate()?;

        let info = self.refresh_login_info().await?;
        debug!(
            bot_id = %self.id(),
            user_id = info.user_id,
            nickname = %info.nickname,
            "Updated bot login info"
        );

        match (&self.inner.channel, &self.inner.config.event_server_host) {
            (Some(channel), _) => {
                channel.start().await?;
                debug!(bot_id = %self.id(), url = %channel.url(), "Event channel started");
            }
            (None, Some(url)) => {
                return Err(BotError::Config(format!(
                    "event_server_host '{url}' is set but no WebSocket connector was provided"
                )));
            }
            (None, None) => debug!(
                bot_id = %self.id(),
                "Event channel disabled because event_server_host is not set"
            ),
        }

        let brand = self.detect_brand().await;
        *self.inner.brand.write() = brand;
        debug!(bot_id = %self.id(), brand = ?brand, "Detected OneBot implementation");

        if !self.inner.started.swap(true, Ordering::SeqCst) {
            info!(bot_id = %self.id(), user_id = info.user_id, "Bot started");
            self.push_in_background(BoxedEvent::new(BotStartedEvent { bot: self.clone() }));
        }
        Ok(())
    }

    /// Cancels the bot and every task it owns. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.lifecycle.is_cancelled() {
            info!(bot_id = %self.id(), "Cancelling bot");
        }
        self.inner.lifecycle.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.inner.lifecycle.is_cancelled()
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Waits until the bot terminates.
    ///
    /// Returns the fatal error that terminated it, if any.
    pub async fn join(&self) -> Result<(), Arc<BotError>> {
        self.inner.lifecycle.join().await
    }

    async fn detect_brand(&self) -> OneBotBrand {
        match self.execute_data(&actions::get_version_info()).await {
            Ok(info) => OneBotBrand::from_app_name(&info.app_name),
            Err(e) => {
                debug!(
                    bot_id = %self.id(),
                    error = %e,
                    "Failed to get version info, using unknown brand"
                );
                OneBotBrand::Unknown
            }
        }
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Resolves a raw event text and pushes the event to the bus.
    ///
    /// Waits for every listener; listener errors are logged. Only a fatal
    /// resolution error is returned.
    pub async fn push_raw(&self, text: &str) -> Result<(), ResolveError> {
        self.resolve_delivery(text)?.await;
        Ok(())
    }

    /// Resolves a raw event text into the delivery of its event to the bus.
    fn resolve_delivery(
        &self,
        text: &str,
    ) -> Result<impl Future<Output = ()> + Send + 'static, ResolveError> {
        let event = self.inner.resolver.resolve(self, text)?;
        let bot_id = self.id().to_owned();
        let event_name = event.event_name();
        let results = self.inner.event_bus.push(event);
        Ok(async move { log_listener_errors(&bot_id, event_name, results).await })
    }

    /// Pushes `event` on a task of this bot without waiting for listeners.
    pub(crate) fn push_in_background(&self, event: BoxedEvent) {
        let bot_id = self.id().to_owned();
        let event_name = event.event_name();
        let results = self.inner.event_bus.push(event);
        let token = self.inner.lifecycle.token().clone();

        self.inner.lifecycle.spawn(async move {
            tokio::select! {
                () = log_listener_errors(&bot_id, event_name, results) => {}
                () = token.cancelled() => {
                    debug!(bot_id = %bot_id, event_name = event_name, "Event push cancelled");
                }
            }
        });
    }

    // ------------------------------------------------------------------------
    // Login info
    // ------------------------------------------------------------------------

    /// Last login info fetched by [`start`](Self::start).
    pub fn login_info(&self) -> Option<LoginInfo> {
        self.inner.login_info.read().clone()
    }

    /// Fetches the login info and caches it.
    pub async fn refresh_login_info(&self) -> BotResult<LoginInfo> {
        let info = self.execute_data(&actions::get_login_info()).await?;
        *self.inner.login_info.write() = Some(info.clone());
        Ok(info)
    }

    /// Returns `true` if `user_id` is the logged-in account or the numeric
    /// form of [`id`](Self::id).
    ///
    /// Before any login info is cached every id counts as the bot.
    pub fn is_me(&self, user_id: i64) -> bool {
        if self.id() == user_id.to_string() {
            return true;
        }
        self.inner
            .login_info
            .read()
            .as_ref()
            .is_none_or(|info| info.user_id == user_id)
    }

    pub fn brand(&self) -> OneBotBrand {
        *self.inner.brand.read()
    }

    // ------------------------------------------------------------------------
    // Actors
    // ------------------------------------------------------------------------

    pub fn friend(&self, user_id: i64) -> OneBotFriend {
        OneBotFriend::new(self.clone(), user_id)
    }

    pub fn group(&self, group_id: i64) -> OneBotGroup {
        OneBotGroup::new(self.clone(), group_id)
    }

    pub fn member(&self, group_id: i64, user_id: i64) -> OneBotMember {
        OneBotMember::new(self.clone(), group_id, user_id)
    }

    /// Fetches a message by id as sendable content.
    pub async fn message_content(&self, message_id: i64) -> BotResult<MessageContent> {
        let message = self.execute_data(&actions::get_msg(message_id)).await?;
        Ok(MessageContent::new(
            message.message_id,
            self.inner.codec.refine_all(message.message),
        ))
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    /// See [`ActionClient::request_raw`].
    pub async fn execute_raw<T>(&self, action: &Action<T>) -> BotResult<String> {
        Ok(self.inner.actions.request_raw(action).await?)
    }

    /// See [`ActionClient::request_result`].
    pub async fn execute_result<T>(&self, action: &Action<T>) -> BotResult<ActionResult<T>> {
        Ok(self.inner.actions.request_result(action).await?)
    }

    /// See [`ActionClient::request_data`].
    pub async fn execute_data<T>(&self, action: &Action<T>) -> BotResult<T> {
        Ok(self.inner.actions.request_data(action).await?)
    }
}

impl fmt::Debug for OneBotBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneBotBot")
            .field("id", &self.id())
            .field("started", &self.is_started())
            .field("active", &self.is_active())
            .field("failed", &self.inner.lifecycle.failure().is_some())
            .finish()
    }
}

async fn log_listener_errors(
    bot_id: &str,
    event_name: &str,
    results: BoxStream<'static, EventResult>,
) {
    results
        .for_each(|result| {
            if let EventResult::Error(e) = result {
                warn!(
                    bot_id = %bot_id,
                    event_name = event_name,
                    error = %e,
                    "Event listener failed"
                );
            }
            ready(())
        })
        .await;
}

// ============================================================================
// Frame Handler
// ============================================================================

struct BotFrameHandler {
    bot: Weak<BotInner>,
}

impl FrameHandler for BotFrameHandler {
    fn handle_frame(&self, text: String) -> Result<Dispatch, ResolveError> {
        let Some(inner) = self.bot.upgrade() else {
            return Ok(Box::pin(ready(())));
        };
        let delivery = OneBotBot { inner }.resolve_delivery(&text)?;
        Ok(Box::pin(delivery))
    }
}
