//! Runtime error types.

use std::sync::Arc;

use obkit_adapter_onebot::BotError;
use obkit_core::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A default transport could not be created.
    #[error("Failed to create transport: {0}")]
    Transport(#[from] TransportError),

    /// A bot failed to start.
    #[error("Bot '{bot_id}' failed to start: {source}")]
    BotStart {
        bot_id: String,
        #[source]
        source: BotError,
    },

    /// A bot terminated with a fatal error while the runtime was running.
    #[error("Bot '{bot_id}' terminated: {source}")]
    BotTerminated {
        bot_id: String,
        #[source]
        source: Arc<BotError>,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
