//! Bot configuration.
//!
//! # Example Configuration
//!
//! ```yaml
//! bot_unique_id: main
//! api_server_host: http://127.0.0.1:3001
//! # Omit to run without an event channel
//! event_server_host: ws://127.0.0.1:3002
//! api_access_token: ${ONEBOT_TOKEN}
//! event_access_token: ${ONEBOT_TOKEN}
//! api_http_request_timeout_millis: 30000
//! # 0 retries forever
//! ws_connect_max_retry_times: 10
//! ws_connect_retry_delay_millis: 3500
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BotError, BotResult};

/// Configuration of a single [`OneBotBot`](crate::OneBotBot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotBotConfig {
    /// Unique id of the bot within the host application.
    pub bot_unique_id: String,

    /// Base URL of the HTTP action server.
    pub api_server_host: String,

    /// URL of the WebSocket event server. No event channel when absent.
    pub event_server_host: Option<String>,

    /// Bearer token for action requests.
    pub api_access_token: Option<String>,

    /// Bearer token for the event connection.
    pub event_access_token: Option<String>,

    pub api_http_request_timeout_millis: Option<u64>,

    pub api_http_connect_timeout_millis: Option<u64>,

    /// Connect attempts after the first failure before the bot terminates.
    /// `0` retries forever.
    pub ws_connect_max_retry_times: u32,

    /// Constant delay between connect attempts.
    pub ws_connect_retry_delay_millis: u64,
}

impl Default for OneBotBotConfig {
    fn default() -> Self {
        Self {
            bot_unique_id: String::new(),
            api_server_host: Self::DEFAULT_API_SERVER_HOST.to_string(),
            event_server_host: None,
            api_access_token: None,
            event_access_token: None,
            api_http_request_timeout_millis: None,
            api_http_connect_timeout_millis: None,
            ws_connect_max_retry_times: 0,
            ws_connect_retry_delay_millis: Self::DEFAULT_RETRY_DELAY_MILLIS,
        }
    }
}

impl OneBotBotConfig {
    pub const DEFAULT_API_SERVER_HOST: &'static str = "http://localhost:3001";
    pub const DEFAULT_RETRY_DELAY_MILLIS: u64 = 3500;

    /// Creates a configuration for `bot_unique_id` with defaults elsewhere.
    pub fn new(bot_unique_id: impl Into<String>) -> Self {
        Self {
            bot_unique_id: bot_unique_id.into(),
            ..Default::default()
        }
    }

    /// Sets the same token for actions and events.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.api_access_token = Some(token.clone());
        self.event_access_token = Some(token);
        self
    }

    pub fn api_server_host(mut self, host: impl Into<String>) -> Self {
        self.api_server_host = host.into();
        self
    }

    pub fn event_server_host(mut self, host: impl Into<String>) -> Self {
        self.event_server_host = Some(host.into());
        self
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.ws_connect_retry_delay_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api_http_request_timeout_millis
            .map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.api_http_connect_timeout_millis
            .map(Duration::from_millis)
    }

    /// Checks the id and host URL schemes.
    pub fn validate(&self) -> BotResult<()> {
        if self.bot_unique_id.trim().is_empty() {
            return Err(BotError::Config("bot_unique_id must not be empty".into()));
        }
        if !has_scheme(&self.api_server_host, &["http://", "https://"]) {
            return Err(BotError::Config(format!(
                "api_server_host '{}' must be an http(s) URL",
                self.api_server_host
            )));
        }
        if let Some(host) = &self.event_server_host
            && !has_scheme(host, &["ws://", "wss://"])
        {
            return Err(BotError::Config(format!(
                "event_server_host '{host}' must be a ws(s) URL"
            )));
        }
        Ok(())
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}
