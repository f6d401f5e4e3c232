//! Runtime orchestration.
//!
//! [`ObkitRuntime`] builds one [`OneBotBot`] per configured entry on the
//! default transports (reqwest for actions, tokio-tungstenite for events),
//! all pushing into one shared [`EventDispatcher`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use obkit_runtime::ObkitRuntime;
//!
//! let runtime = ObkitRuntime::builder()
//!     .config_file("config/obkit.yaml")
//!     .build()?;
//!
//! runtime.dispatcher().listen(|event| async move {
//!     tracing::info!(event = event.event_name(), "Received");
//!     Ok(())
//! });
//!
//! // Until Ctrl+C, SIGTERM or a fatal bot error
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use figment::Provider;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use obkit_adapter_onebot::{OneBotBot, OneBotBotBuilder, OneBotBotConfig};
use obkit_core::EventDispatcher;
use obkit_transport::{HttpClientOptions, ReqwestHttpClient, TungsteniteConnector};
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ObkitConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

type BotCustomizer = Box<dyn Fn(OneBotBotBuilder) -> OneBotBotBuilder + Send + Sync>;

/// Runs the configured bots.
pub struct ObkitRuntime {
    config: ObkitConfig,
    dispatcher: Arc<EventDispatcher>,
    bots: Vec<OneBotBot>,
    running: AtomicBool,
}

impl ObkitRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging, validates the configuration and builds the bots
    /// without connecting anything.
    pub fn from_config(config: ObkitConfig) -> RuntimeResult<Self> {
        Self::with_customizer(config, None)
    }

    fn with_customizer(config: ObkitConfig, customize: Option<BotCustomizer>) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        validate_config(&config)?;

        let dispatcher = Arc::new(EventDispatcher::new());
        let ws_connector = Arc::new(TungsteniteConnector::new());

        let mut bots = Vec::with_capacity(config.bots.len());
        for bot_config in &config.bots {
            let builder = Self::bot_builder(bot_config, &dispatcher, ws_connector.clone())?;
            let builder = match &customize {
                Some(customize) => customize(builder),
                None => builder,
            };
            let bot = builder.build();
            debug!(
                bot_id = %bot.id(),
                api = %bot_config.api_server_host,
                event = ?bot_config.event_server_host,
                "Bot created"
            );
            bots.push(bot);
        }

        info!(
            log_level = %config.logging.level,
            bots = bots.len(),
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            dispatcher,
            bots,
            running: AtomicBool::new(false),
        })
    }

    fn bot_builder(
        config: &OneBotBotConfig,
        dispatcher: &Arc<EventDispatcher>,
        ws_connector: Arc<TungsteniteConnector>,
    ) -> RuntimeResult<OneBotBotBuilder> {
        let http = ReqwestHttpClient::with_options(HttpClientOptions {
            request_timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
        })?;

        Ok(OneBotBot::builder(config.clone(), Arc::new(http))
            .ws_connector(ws_connector)
            .event_bus(dispatcher.clone()))
    }

    pub fn config(&self) -> &ObkitConfig {
        &self.config
    }

    /// The bus every bot pushes its events into.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn bots(&self) -> &[OneBotBot] {
        &self.bots
    }

    pub fn bot(&self, id: &str) -> Option<&OneBotBot> {
        self.bots.iter().find(|bot| bot.id() == id)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts every bot in configuration order.
    ///
    /// If one fails, every bot is cancelled and the error is returned.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Runtime is already running");
            return Ok(());
        }

        info!("Starting obkit runtime");
        for bot in &self.bots {
            if let Err(e) = bot.start().await {
                error!(bot_id = %bot.id(), error = %e, "Failed to start bot");
                self.stop().await;
                return Err(RuntimeError::BotStart {
                    bot_id: bot.id().to_owned(),
                    source: e,
                });
            }
            info!(bot_id = %bot.id(), "Bot started");
        }
        info!("Runtime started");
        Ok(())
    }

    /// Cancels every bot and waits for them to terminate.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Runtime is not running");
        }

        info!("Stopping obkit runtime");
        for bot in &self.bots {
            bot.cancel();
        }
        for bot in &self.bots {
            if let Err(e) = bot.join().await {
                debug!(bot_id = %bot.id(), error = %e, "Bot had terminated with an error");
            }
        }
        info!("Runtime stopped");
    }

    /// Runs until Ctrl+C, SIGTERM, or a bot terminating with a fatal error.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or a bot terminates with a fatal error.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        info!("obkit runtime is now running");

        let result = tokio::select! {
            () = shutdown => Ok(()),
            result = self.wait_for_bots() => result,
        };

        self.stop().await;
        result
    }

    /// Completes when every bot has terminated, or on the first fatal one.
    /// Never completes without bots.
    async fn wait_for_bots(&self) -> RuntimeResult<()> {
        if self.bots.is_empty() {
            return std::future::pending().await;
        }

        let mut joins: FuturesUnordered<_> = self
            .bots
            .iter()
            .map(|bot| async move { (bot.id(), bot.join().await) })
            .collect();

        while let Some((bot_id, result)) = joins.next().await {
            match result {
                Ok(()) => info!(bot_id = %bot_id, "Bot terminated"),
                Err(source) => {
                    return Err(RuntimeError::BotTerminated {
                        bot_id: bot_id.to_owned(),
                        source,
                    });
                }
            }
        }
        info!("All bots terminated");
        Ok(())
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Loads the configuration and creates an [`ObkitRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    customize: Option<BotCustomizer>,
}

impl RuntimeBuilder {
    /// Searches the current directory by default.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            customize: None,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a provider on top of the loaded configuration.
    pub fn merge<P: Provider>(mut self, provider: P) -> Self {
        self.config_loader = self.config_loader.merge(provider);
        self
    }

    /// Adjusts every bot before it is built, e.g. to add custom resolvers
    /// or segment types.
    ///
    /// ```rust,ignore
    /// ObkitRuntime::builder()
    ///     .customize_bots(|bot| bot.segment::<Markdown>("markdown"))
    ///     .build()?;
    /// ```
    pub fn customize_bots<F>(mut self, f: F) -> Self
    where
        F: Fn(OneBotBotBuilder) -> OneBotBotBuilder + Send + Sync + 'static,
    {
        self.customize = Some(Box::new(f));
        self
    }

    pub fn build(self) -> RuntimeResult<ObkitRuntime> {
        let config = self.config_loader.load()?;
        ObkitRuntime::with_customizer(config, self.customize)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use obkit_adapter_onebot::BotError;

    use super::*;
    use crate::config::ConfigError;

    fn config_with(bots: Vec<OneBotBotConfig>) -> ObkitConfig {
        ObkitConfig {
            bots,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_builds_one_bot_per_entry() {
        let runtime = ObkitRuntime::from_config(config_with(vec![
            OneBotBotConfig::new("a"),
            OneBotBotConfig::new("b").event_server_host("ws://127.0.0.1:3002"),
        ]))
        .unwrap();

        assert_eq!(runtime.bots().len(), 2);
        assert_eq!(runtime.bot("b").map(OneBotBot::id), Some("b"));
        assert!(runtime.bot("c").is_none());
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = ObkitRuntime::from_config(config_with(vec![
            OneBotBotConfig::new("a"),
            OneBotBotConfig::new("a"),
        ]));
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::DuplicateBotId(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_until_without_bots() {
        let runtime = ObkitRuntime::from_config(ObkitConfig::default()).unwrap();
        runtime.run_until(async {}).await.unwrap();
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_start_failure_cancels_bots() {
        let runtime = ObkitRuntime::from_config(config_with(vec![
            OneBotBotConfig::new("unreachable").api_server_host("http://127.0.0.1:1"),
        ]))
        .unwrap();

        let err = runtime.run_until(async {}).await.unwrap_err();
        match err {
            RuntimeError::BotStart { bot_id, source } => {
                assert_eq!(bot_id, "unreachable");
                assert!(matches!(source, BotError::Api(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(runtime.bots().iter().all(|bot| !bot.is_active()));
    }

    #[tokio::test]
    async fn test_customize_bots() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let runtime = ObkitRuntime::with_customizer(
            config_with(vec![OneBotBotConfig::new("a"), OneBotBotConfig::new("b")]),
            Some(Box::new(move |builder| {
                counter.fetch_add(1, Ordering::SeqCst);
                builder
            })),
        )
        .unwrap();

        assert_eq!(runtime.bots().len(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
