//! # obkit
//!
//! A OneBot v11 client toolkit: typed actions over HTTP, events over a
//! reconnecting WebSocket, and an interception pipeline around every send.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────────┐     ┌─────────────────┐
//! │   Runtime   │────▶│ OneBotBot (per config)   │────▶│ EventDispatcher │──▶ listeners
//! │  (config,   │     │  EventChannel ─ Resolver │     └─────────────────┘
//! │   logging)  │     │  ActionClient ◀─ send    │◀──── SendSupport / ReplySupport
//! └─────────────┘     └──────────────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, sets up logging, builds and runs bots
//! - **OneBotBot**: one gateway connection, see [`onebot`]
//! - **Transport**: reqwest and tokio-tungstenite implementations, see [`transport`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use obkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = ObkitRuntime::builder().build()?;
//!
//!     runtime.dispatcher().listen_to::<OneBotEvent, _, _>(|event| async move {
//!         let event = event.downcast_ref::<OneBotEvent>().unwrap();
//!         if event.plain_text() == "ping" {
//!             event.reply("pong").await?;
//!         }
//!         Ok(())
//!     });
//!
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `runtime` *(default)*: [`ObkitRuntime`](runtime::ObkitRuntime) and configuration loading
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `http-client` / `ws-client` / `full-transport`: transports without the runtime

pub use obkit_adapter_onebot as onebot;
pub use obkit_core as core;
#[cfg(feature = "runtime")]
pub use obkit_runtime as runtime;
pub use obkit_transport as transport;

/// Common imports for bot applications.
pub mod prelude {
    #[cfg(feature = "runtime")]
    pub use obkit_runtime::{ObkitConfig, ObkitRuntime};

    pub use obkit_adapter_onebot::prelude::*;
    pub use obkit_core::{BoxedEvent, Event, EventBus, EventDispatcher, EventType, RichText};
}
