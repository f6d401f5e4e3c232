//! Raw OneBot v11 event shapes.
//!
//! One struct per `(post_type, sub_type)` pair, decoded straight from the
//! wire object. [`RawEvent`] is the closed union of all of them; the
//! resolver turns it into an application-facing
//! [`OneBotEvent`](crate::OneBotEvent).
//!
//! ```text
//! message     ─┬─ group           RawGroupMessageEvent
//!              └─ private         RawPrivateMessageEvent
//! meta_event  ─┬─ lifecycle       RawLifecycleEvent
//!              └─ heartbeat       RawHeartbeatEvent
//! request     ─┬─ friend          RawFriendRequestEvent
//!              └─ group           RawGroupRequestEvent
//! notice      ─┬─ group_upload    RawGroupUploadEvent
//!              ├─ ...
//!              └─ notify          RawNotifyEvent (poke / lucky_king / honor)
//! ```

pub mod message;
pub mod meta;
pub mod notice;
pub mod request;

pub use message::*;
pub use meta::*;
pub use notice::*;
pub use request::*;

use serde_json::Value;

/// Decodes one raw event shape from the wire object.
pub type RawDecodeFn = fn(Value) -> serde_json::Result<RawEvent>;

macro_rules! raw_events {
    ($($(#[$meta:meta])* $variant:ident($ty:ty) => ($post:literal, $sub:literal),)*) => {
        /// Any standard raw event.
        #[derive(Debug, Clone, PartialEq)]
        pub enum RawEvent {
            $($(#[$meta])* $variant($ty),)*
        }

        impl RawEvent {
            /// Event time in seconds.
            pub fn time(&self) -> i64 {
                match self {
                    $(Self::$variant(e) => e.time,)*
                }
            }

            /// Id of the bot account that received the event.
            pub fn self_id(&self) -> i64 {
                match self {
                    $(Self::$variant(e) => e.self_id,)*
                }
            }

            /// The `(post_type, sub_type)` pair this shape is registered under.
            pub fn kind(&self) -> (&'static str, &'static str) {
                match self {
                    $(Self::$variant(_) => ($post, $sub),)*
                }
            }
        }

        $(
            impl From<$ty> for RawEvent {
                fn from(event: $ty) -> Self {
                    Self::$variant(event)
                }
            }
        )*

        /// Decoders of every standard shape, keyed by `(post_type, sub_type)`.
        pub(crate) fn standard_decoders() -> Vec<(&'static str, &'static str, RawDecodeFn)> {
            vec![
                $((
                    $post,
                    $sub,
                    (|v: Value| serde_json::from_value::<$ty>(v).map(RawEvent::$variant)) as RawDecodeFn,
                ),)*
            ]
        }
    };
}

raw_events! {
    GroupMessage(RawGroupMessageEvent) => ("message", "group"),
    PrivateMessage(RawPrivateMessageEvent) => ("message", "private"),
    Lifecycle(RawLifecycleEvent) => ("meta_event", "lifecycle"),
    Heartbeat(RawHeartbeatEvent) => ("meta_event", "heartbeat"),
    FriendRequest(RawFriendRequestEvent) => ("request", "friend"),
    GroupRequest(RawGroupRequestEvent) => ("request", "group"),
    GroupUpload(RawGroupUploadEvent) => ("notice", "group_upload"),
    GroupAdmin(RawGroupAdminEvent) => ("notice", "group_admin"),
    GroupDecrease(RawGroupDecreaseEvent) => ("notice", "group_decrease"),
    GroupIncrease(RawGroupIncreaseEvent) => ("notice", "group_increase"),
    GroupBan(RawGroupBanEvent) => ("notice", "group_ban"),
    FriendAdd(RawFriendAddEvent) => ("notice", "friend_add"),
    GroupRecall(RawGroupRecallEvent) => ("notice", "group_recall"),
    FriendRecall(RawFriendRecallEvent) => ("notice", "friend_recall"),
    Notify(RawNotifyEvent) => ("notice", "notify"),
    /// Decoded but without a dedicated event type.
    GroupCard(RawGroupCardEvent) => ("notice", "group_card"),
    /// Decoded but without a dedicated event type.
    OfflineFile(RawOfflineFileEvent) => ("notice", "offline_file"),
    /// Decoded but without a dedicated event type.
    ClientStatus(RawClientStatusEvent) => ("notice", "client_status"),
    /// Decoded but without a dedicated event type.
    Essence(RawEssenceEvent) => ("notice", "essence"),
}
