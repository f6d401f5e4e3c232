//! Configuration module for the obkit runtime.
//!
//! Layered loading (defaults, files, `OBKIT_*` environment variables) of the
//! logging settings and the OneBot bot entries, plus validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ObkitConfig, SpanEventConfig,
};
pub use validation::validate_config;
