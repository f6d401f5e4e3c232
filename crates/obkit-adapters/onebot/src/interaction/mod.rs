//! Send interception.
//!
//! Every send made through the [actors](crate::actor) goes through the same
//! pipeline:
//!
//! ```text
//! send(message)
//!   │
//!   ▼
//! MessagePreSendEvent ──▶ listeners (in order, may replace the message)
//!   │                         │ any error
//!   │                         ▼
//!   │                  Err(InterceptionError { suppressed: [E1, E2, ..] })
//!   ▼
//! take message (once) ──▶ send_private_msg / send_group_msg
//!   │
//!   ▼
//! Arc<SendReceipt> ──┬──▶ returned to the caller
//!                    └──▶ MessagePostSendEvent (background)
//! ```

mod event;
mod message;
mod pipeline;
mod receipt;

pub use event::{MessagePostSendEvent, MessagePreSendEvent};
pub use message::{InteractionMessage, MessageContent};
pub use receipt::SendReceipt;

pub(crate) use pipeline::send;

/// Destination of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendTarget {
    Friend { user_id: i64 },
    Group { group_id: i64 },
    /// Temporary session with a group member.
    Member { group_id: i64, user_id: i64 },
}
