//! # obkit OneBot v11 engine
//!
//! Client-side protocol engine for OneBot v11 gateways: actions go over
//! HTTP, events arrive over a reconnecting WebSocket.
//!
//! ## Overview
//!
//! ```text
//!                 ┌──────────── OneBotBot ─────────────┐
//! gateway ──ws──▶ │ EventChannel ──▶ EventResolver ──▶ │ ──▶ EventBus
//!                 │                                    │
//! gateway ◀─http─ │ ActionClient ◀── send pipeline  ◀─ │ ◀── SendSupport / ReplySupport
//!                 └────────────────────────────────────┘
//! ```
//!
//! - [`OneBotBot`] - lifecycle, login info, brand, actors
//! - [`EventResolver`] - raw text to [`OneBotEvent`], custom events or
//!   [`UnknownEvent`]
//! - [`ActionClient`] - typed `{retcode, status, data}` actions
//! - [`interaction`] - pre/post-send events around every send
//! - [`SegmentCodec`] - message segments, extensible per tag
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use obkit_adapter_onebot::prelude::*;
//! use obkit_core::EventDispatcher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dispatcher = Arc::new(EventDispatcher::new());
//!     dispatcher.listen_to::<OneBotEvent, _, _>(|event| async move {
//!         let event = event.downcast_ref::<OneBotEvent>().unwrap();
//!         if event.plain_text() == "ping" {
//!             event.reply("pong").await?;
//!         }
//!         Ok(())
//!     });
//!
//!     let config = OneBotBotConfig::new("main").event_server_host("ws://127.0.0.1:3002");
//!     let bot = OneBotBot::builder(config, http_client)
//!         .ws_connector(ws_connector)
//!         .event_bus(dispatcher)
//!         .build();
//!
//!     bot.start().await?;
//!     bot.join().await.map_err(|e| anyhow::anyhow!("{e}"))
//! }
//! ```

pub mod actor;
pub mod api;
pub mod bot;
pub(crate) mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod interaction;
pub(crate) mod lifecycle;
pub mod model;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use actor::{DeleteSupport, OneBotFriend, OneBotGroup, OneBotMember, ReplySupport, SendSupport};
pub use api::{Action, ActionClient, ActionResult, CustomAction};
pub use bot::{OneBotBot, OneBotBotBuilder, OneBotBrand};
pub use channel::CLOSE_TIMEOUT;
pub use codec::{SegmentCodec, SegmentRegistry};
pub use config::OneBotBotConfig;
pub use error::{ApiError, ApiResult, BotError, BotResult, InterceptionError, ResolveError};
pub use event::{BotStartedEvent, OneBotEvent, OneBotEventKind, PLATFORM, UnknownEvent};
pub use interaction::{
    InteractionMessage, MessageContent, MessagePostSendEvent, MessagePreSendEvent, SendReceipt,
    SendTarget,
};
pub use model::segment::{CustomSegment, Segment};
pub use resolver::{
    CustomEventResolver, EventResolver, FnResolver, RawEventRegistry, ResolverContext,
    SerdeEventResolver,
};

/// Common imports for bot code.
pub mod prelude {
    pub use crate::actor::{DeleteSupport, ReplySupport, SendSupport};
    pub use crate::bot::OneBotBot;
    pub use crate::config::OneBotBotConfig;
    pub use crate::error::{BotError, BotResult};
    pub use crate::event::{OneBotEvent, OneBotEventKind, UnknownEvent};
    pub use crate::interaction::{
        InteractionMessage, MessagePostSendEvent, MessagePreSendEvent, SendReceipt,
    };
    pub use crate::model::segment::Segment;
}
