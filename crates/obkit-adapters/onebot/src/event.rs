//! Application-facing OneBot events.
//!
//! Everything the bot pushes to the [`EventBus`](obkit_core::EventBus) is
//! one of:
//!
//! - [`OneBotEvent`] - a classified standard event, see [`OneBotEventKind`]
//! - [`UnknownEvent`] - a payload nothing could classify
//! - [`BotStartedEvent`] - pushed once after the first successful start
//! - the interception events in [`interaction`](crate::interaction)
//! - whatever a custom resolver returns
//!
//! ```rust,ignore
//! dispatcher.listen_to::<OneBotEvent, _, _>(|event| async move {
//!     if let OneBotEventKind::NormalGroupMessage(msg) = event.kind() {
//!         event.reply(format!("echo: {}", plain_text(&msg.message))).await?;
//!     }
//!     Ok(())
//! });
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use obkit_core::{Event, EventType};

use crate::bot::OneBotBot;
use crate::error::ResolveError;
use crate::model::event::*;
use crate::model::segment::Segment;

/// Platform name reported by every event of this crate.
pub const PLATFORM: &str = "onebot";

// ============================================================================
// OneBotEvent
// ============================================================================

/// Classification of a standard raw event.
///
/// Variants sharing a raw shape differ in meaning, e.g. the three poke
/// variants all carry a [`RawNotifyEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum OneBotEventKind {
    NormalGroupMessage(RawGroupMessageEvent),
    AnonymousGroupMessage(RawGroupMessageEvent),
    /// System message in a group.
    NoticeGroupMessage(RawGroupMessageEvent),
    /// Group message with an unrecognized `sub_type`.
    DefaultGroupMessage(RawGroupMessageEvent),
    FriendMessage(RawPrivateMessageEvent),
    /// Temporary session started from a group.
    GroupPrivateMessage(RawPrivateMessageEvent),
    /// Private message with an unrecognized `sub_type`.
    DefaultPrivateMessage(RawPrivateMessageEvent),
    Lifecycle(RawLifecycleEvent),
    Heartbeat(RawHeartbeatEvent),
    FriendRequest(RawFriendRequestEvent),
    GroupRequest(RawGroupRequestEvent),
    FriendAdd(RawFriendAddEvent),
    FriendRecall(RawFriendRecallEvent),
    GroupAdmin(RawGroupAdminEvent),
    GroupBan(RawGroupBanEvent),
    GroupMemberIncrease(RawGroupIncreaseEvent),
    GroupMemberDecrease(RawGroupDecreaseEvent),
    GroupRecall(RawGroupRecallEvent),
    GroupUpload(RawGroupUploadEvent),
    Honor(RawNotifyEvent),
    LuckyKing(RawNotifyEvent),
    /// Poke in a private chat.
    PrivatePoke(RawNotifyEvent),
    /// Poke in a group whose target is the bot itself.
    BotSelfPoke(RawNotifyEvent),
    /// Poke in a group whose target is another member.
    MemberPoke(RawNotifyEvent),
    /// Decoded but without a dedicated variant.
    Unsupported(RawEvent),
}

impl OneBotEventKind {
    /// Returns the event name, e.g. `onebot.message.group.normal`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NormalGroupMessage(_) => "onebot.message.group.normal",
            Self::AnonymousGroupMessage(_) => "onebot.message.group.anonymous",
            Self::NoticeGroupMessage(_) => "onebot.message.group.notice",
            Self::DefaultGroupMessage(_) => "onebot.message.group",
            Self::FriendMessage(_) => "onebot.message.private.friend",
            Self::GroupPrivateMessage(_) => "onebot.message.private.group",
            Self::DefaultPrivateMessage(_) => "onebot.message.private",
            Self::Lifecycle(_) => "onebot.meta_event.lifecycle",
            Self::Heartbeat(_) => "onebot.meta_event.heartbeat",
            Self::FriendRequest(_) => "onebot.request.friend",
            Self::GroupRequest(_) => "onebot.request.group",
            Self::FriendAdd(_) => "onebot.notice.friend_add",
            Self::FriendRecall(_) => "onebot.notice.friend_recall",
            Self::GroupAdmin(_) => "onebot.notice.group_admin",
            Self::GroupBan(_) => "onebot.notice.group_ban",
            Self::GroupMemberIncrease(_) => "onebot.notice.group_increase",
            Self::GroupMemberDecrease(_) => "onebot.notice.group_decrease",
            Self::GroupRecall(_) => "onebot.notice.group_recall",
            Self::GroupUpload(_) => "onebot.notice.group_upload",
            Self::Honor(_) => "onebot.notice.notify.honor",
            Self::LuckyKing(_) => "onebot.notice.notify.lucky_king",
            Self::PrivatePoke(_) => "onebot.notice.notify.poke.private",
            Self::BotSelfPoke(_) => "onebot.notice.notify.poke.self",
            Self::MemberPoke(_) => "onebot.notice.notify.poke.member",
            Self::Unsupported(_) => "onebot.unsupported",
        }
    }

    /// Returns the high-level classification.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::NormalGroupMessage(_)
            | Self::AnonymousGroupMessage(_)
            | Self::NoticeGroupMessage(_)
            | Self::DefaultGroupMessage(_)
            | Self::FriendMessage(_)
            | Self::GroupPrivateMessage(_)
            | Self::DefaultPrivateMessage(_) => EventType::Message,
            Self::Lifecycle(_) | Self::Heartbeat(_) => EventType::Meta,
            Self::FriendRequest(_) | Self::GroupRequest(_) => EventType::Request,
            Self::Unsupported(raw) => raw.kind().0.parse().unwrap_or(EventType::Other),
            _ => EventType::Notice,
        }
    }
}

/// A classified standard event.
///
/// Keeps the source text and a handle to the receiving bot, so listeners can
/// answer through [`ReplySupport`](crate::ReplySupport).
#[derive(Clone)]
pub struct OneBotEvent {
    bot: OneBotBot,
    source: Arc<str>,
    kind: OneBotEventKind,
}

impl OneBotEvent {
    pub(crate) fn new(bot: OneBotBot, source: Arc<str>, kind: OneBotEventKind) -> Self {
        Self { bot, source, kind }
    }

    /// The bot that received the event.
    pub fn bot(&self) -> &OneBotBot {
        &self.bot
    }

    pub fn kind(&self) -> &OneBotEventKind {
        &self.kind
    }

    /// The JSON text the event was decoded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn time(&self) -> i64 {
        self.raw_event().time()
    }

    pub fn self_id(&self) -> i64 {
        self.raw_event().self_id()
    }

    /// Returns the group message, whatever its sub type.
    pub fn as_group_message(&self) -> Option<&RawGroupMessageEvent> {
        match &self.kind {
            OneBotEventKind::NormalGroupMessage(e)
            | OneBotEventKind::AnonymousGroupMessage(e)
            | OneBotEventKind::NoticeGroupMessage(e)
            | OneBotEventKind::DefaultGroupMessage(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the private message, whatever its sub type.
    pub fn as_private_message(&self) -> Option<&RawPrivateMessageEvent> {
        match &self.kind {
            OneBotEventKind::FriendMessage(e)
            | OneBotEventKind::GroupPrivateMessage(e)
            | OneBotEventKind::DefaultPrivateMessage(e) => Some(e),
            _ => None,
        }
    }

    /// Segments of a message event.
    pub fn message(&self) -> Option<&[Segment]> {
        self.as_group_message()
            .map(|e| e.message.as_slice())
            .or_else(|| self.as_private_message().map(|e| e.message.as_slice()))
    }

    /// Id of a message event.
    pub fn message_id(&self) -> Option<i64> {
        self.as_group_message()
            .map(|e| e.message_id)
            .or_else(|| self.as_private_message().map(|e| e.message_id))
    }

    /// Plain text of a message event; empty for other events.
    pub fn plain_text(&self) -> String {
        self.message().map(plain_text).unwrap_or_default()
    }

    /// Rebuilds the raw event this one was classified from.
    pub fn raw_event(&self) -> RawEvent {
        match &self.kind {
            OneBotEventKind::NormalGroupMessage(e)
            | OneBotEventKind::AnonymousGroupMessage(e)
            | OneBotEventKind::NoticeGroupMessage(e)
            | OneBotEventKind::DefaultGroupMessage(e) => e.clone().into(),
            OneBotEventKind::FriendMessage(e)
            | OneBotEventKind::GroupPrivateMessage(e)
            | OneBotEventKind::DefaultPrivateMessage(e) => e.clone().into(),
            OneBotEventKind::Lifecycle(e) => e.clone().into(),
            OneBotEventKind::Heartbeat(e) => e.clone().into(),
            OneBotEventKind::FriendRequest(e) => e.clone().into(),
            OneBotEventKind::GroupRequest(e) => e.clone().into(),
            OneBotEventKind::FriendAdd(e) => e.clone().into(),
            OneBotEventKind::FriendRecall(e) => e.clone().into(),
            OneBotEventKind::GroupAdmin(e) => e.clone().into(),
            OneBotEventKind::GroupBan(e) => e.clone().into(),
            OneBotEventKind::GroupMemberIncrease(e) => e.clone().into(),
            OneBotEventKind::GroupMemberDecrease(e) => e.clone().into(),
            OneBotEventKind::GroupRecall(e) => e.clone().into(),
            OneBotEventKind::GroupUpload(e) => e.clone().into(),
            OneBotEventKind::Honor(e)
            | OneBotEventKind::LuckyKing(e)
            | OneBotEventKind::PrivatePoke(e)
            | OneBotEventKind::BotSelfPoke(e)
            | OneBotEventKind::MemberPoke(e) => e.clone().into(),
            OneBotEventKind::Unsupported(raw) => raw.clone(),
        }
    }
}

impl fmt::Debug for OneBotEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneBotEvent")
            .field("bot", &self.bot.id())
            .field("kind", &self.kind)
            .finish()
    }
}

impl Event for OneBotEvent {
    fn event_name(&self) -> &'static str {
        self.kind.name()
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn raw_json(&self) -> Option<&str> {
        Some(&self.source)
    }
}

// ============================================================================
// UnknownEvent
// ============================================================================

/// A payload that neither the standard shapes nor a custom resolver
/// classified.
#[derive(Debug)]
pub struct UnknownEvent {
    pub source: Arc<str>,
    pub json: Map<String, Value>,
    pub post_type: String,
    pub sub_type: Option<String>,
    /// `-1` when the payload has no `time`.
    pub time: i64,
    /// `0` when the payload has no `self_id`.
    pub self_id: i64,
    /// Why classification failed, when something actually failed.
    pub reason: Option<ResolveError>,
}

impl Event for UnknownEvent {
    fn event_name(&self) -> &'static str {
        "onebot.unknown"
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        self.post_type.parse().unwrap_or(EventType::Other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn raw_json(&self) -> Option<&str> {
        Some(&self.source)
    }
}

// ============================================================================
// BotStartedEvent
// ============================================================================

/// Pushed once, after the first successful [`OneBotBot::start`].
#[derive(Debug, Clone)]
pub struct BotStartedEvent {
    pub bot: OneBotBot,
}

impl Event for BotStartedEvent {
    fn event_name(&self) -> &'static str {
        "onebot.bot.started"
    }

    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn event_type(&self) -> EventType {
        EventType::Internal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_event_types() {
        let notify = RawNotifyEvent {
            time: 1,
            self_id: 10,
            sub_type: "poke".into(),
            group_id: Some(1),
            user_id: 2,
            target_id: Some(10),
            honor_type: None,
        };
        let kind = OneBotEventKind::BotSelfPoke(notify);
        assert_eq!(kind.event_type(), EventType::Notice);
        assert_eq!(kind.name(), "onebot.notice.notify.poke.self");

        let lifecycle = OneBotEventKind::Lifecycle(RawLifecycleEvent {
            time: 1,
            self_id: 10,
            sub_type: "connect".into(),
        });
        assert_eq!(lifecycle.event_type(), EventType::Meta);

        let unsupported = OneBotEventKind::Unsupported(RawEvent::ClientStatus(
            RawClientStatusEvent {
                time: 1,
                self_id: 10,
                client: Value::Null,
                online: true,
            },
        ));
        assert_eq!(unsupported.event_type(), EventType::Notice);
    }

    #[test]
    fn test_unknown_event_type_from_post_type() {
        let event = UnknownEvent {
            source: Arc::from("{}"),
            json: Map::new(),
            post_type: "meta_event".into(),
            sub_type: None,
            time: -1,
            self_id: 0,
            reason: None,
        };
        assert_eq!(event.event_type(), EventType::Meta);
        assert_eq!(event.raw_json(), Some("{}"));
    }
}
