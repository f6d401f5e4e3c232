//! Configuration schema definitions.
//!
//! ```yaml
//! logging:
//!   level: info
//!   format: compact
//!   filters:
//!     obkit_adapter_onebot: debug
//! bots:
//!   - bot_unique_id: main
//!     api_server_host: http://127.0.0.1:3001
//!     event_server_host: ws://127.0.0.1:3002
//!     api_access_token: secret
//!     event_access_token: secret
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use obkit_adapter_onebot::OneBotBotConfig;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObkitConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// One entry per bot; each becomes a [`OneBotBot`](obkit_adapter_onebot::OneBotBot).
    #[serde(default)]
    pub bots: Vec<OneBotBotConfig>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Rotation of the log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include file names and line numbers.
    pub file_location: bool,
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Per-target levels, e.g. `obkit_adapter_onebot: debug`.
    pub filters: HashMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging() {
        let config = ObkitConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.bots.is_empty());
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
