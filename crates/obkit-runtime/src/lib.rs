//! obkit Runtime - configuration, logging and bot orchestration.
//!
//! This crate provides:
//! - Layered configuration loading with figment ([`ConfigLoader`])
//! - Logging setup on `tracing-subscriber` ([`LoggingBuilder`])
//! - [`ObkitRuntime`], which builds the configured OneBot bots on the
//!   default transports and runs them until shutdown
//!
//! ```rust,ignore
//! use obkit_runtime::ObkitRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ObkitRuntime::builder().build()?;
//!     runtime.dispatcher().listen(|event| async move {
//!         tracing::info!(event = event.event_name(), "Received");
//!         Ok(())
//!     });
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, ObkitConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ObkitRuntime, RuntimeBuilder};

pub use tracing;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
