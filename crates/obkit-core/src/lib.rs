//! # obkit Core
//!
//! Protocol-neutral building blocks shared by every obkit crate.
//!
//! - **Event System**: type-erased events with runtime downcasting ([`Event`], [`BoxedEvent`])
//! - **Event Bus**: the collaborator every engine pushes events into ([`EventBus`]),
//!   with an in-process implementation ([`EventDispatcher`])
//! - **Transport Capabilities**: narrow HTTP and WebSocket client traits
//!   ([`HttpClient`], [`WsConnector`], [`WsConnection`])
//! - **Message Abstractions**: protocol-agnostic rich text ([`RichText`])
//!
//! ```text
//! ┌──────────────┐  frames  ┌──────────────┐  events  ┌───────────────┐
//! │  Transport   │─────────▶│   Adapter    │─────────▶│   EventBus    │
//! │ (capability) │◀─────────│  (OneBot)    │◀─────────│  (listeners)  │
//! └──────────────┘ requests └──────────────┘ results  └───────────────┘
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod message;
pub mod transport;

pub use bus::{EventBus, EventDispatcher, EventListener, EventResult, FnListener, TypedListener};
pub use error::{TransportError, TransportResult};
pub use event::{BoxedEvent, Event, EventType};
pub use message::{RichText, RichTextSegment};
pub use transport::{
    CloseReason, HttpClient, HttpMethod, HttpRequest, HttpResponse, WsConnection, WsConnector,
    WsFrame,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bus::{EventBus, EventDispatcher, EventListener, EventResult};
    pub use super::event::{BoxedEvent, Event, EventType};
    pub use super::message::{RichText, RichTextSegment};
}
