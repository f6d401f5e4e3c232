//! Raw event → [`OneBotEventKind`] classification.
//!
//! Total over [`RawEvent`]: shapes without a dedicated variant map to
//! [`OneBotEventKind::Unsupported`].

use crate::codec::SegmentCodec;
use crate::event::OneBotEventKind;
use crate::model::event::*;

/// Classifies a decoded raw event.
///
/// Message segments are refined with `codec`, so segment types registered on
/// the bot are recognized inside received messages.
pub fn classify(raw: RawEvent, codec: &SegmentCodec) -> OneBotEventKind {
    match raw {
        RawEvent::GroupMessage(mut event) => {
            event.message = codec.refine_all(event.message);
            match event.sub_type.as_str() {
                RawGroupMessageEvent::SUB_TYPE_NORMAL => OneBotEventKind::NormalGroupMessage(event),
                RawGroupMessageEvent::SUB_TYPE_ANONYMOUS => {
                    OneBotEventKind::AnonymousGroupMessage(event)
                }
                RawGroupMessageEvent::SUB_TYPE_NOTICE => OneBotEventKind::NoticeGroupMessage(event),
                _ => OneBotEventKind::DefaultGroupMessage(event),
            }
        }
        RawEvent::PrivateMessage(mut event) => {
            event.message = codec.refine_all(event.message);
            match event.sub_type.as_str() {
                RawPrivateMessageEvent::SUB_TYPE_FRIEND => OneBotEventKind::FriendMessage(event),
                RawPrivateMessageEvent::SUB_TYPE_GROUP => {
                    OneBotEventKind::GroupPrivateMessage(event)
                }
                _ => OneBotEventKind::DefaultPrivateMessage(event),
            }
        }
        RawEvent::Lifecycle(event) => OneBotEventKind::Lifecycle(event),
        RawEvent::Heartbeat(event) => OneBotEventKind::Heartbeat(event),
        RawEvent::FriendRequest(event) => OneBotEventKind::FriendRequest(event),
        RawEvent::GroupRequest(event) => OneBotEventKind::GroupRequest(event),
        RawEvent::FriendAdd(event) => OneBotEventKind::FriendAdd(event),
        RawEvent::FriendRecall(event) => OneBotEventKind::FriendRecall(event),
        RawEvent::GroupAdmin(event) => OneBotEventKind::GroupAdmin(event),
        RawEvent::GroupBan(event) => OneBotEventKind::GroupBan(event),
        RawEvent::GroupIncrease(event) => OneBotEventKind::GroupMemberIncrease(event),
        RawEvent::GroupDecrease(event) => OneBotEventKind::GroupMemberDecrease(event),
        RawEvent::GroupRecall(event) => OneBotEventKind::GroupRecall(event),
        RawEvent::GroupUpload(event) => OneBotEventKind::GroupUpload(event),
        RawEvent::Notify(event) => classify_notify(event),
        other @ (RawEvent::GroupCard(_)
        | RawEvent::OfflineFile(_)
        | RawEvent::ClientStatus(_)
        | RawEvent::Essence(_)) => OneBotEventKind::Unsupported(other),
    }
}

fn classify_notify(event: RawNotifyEvent) -> OneBotEventKind {
    match event.sub_type.as_str() {
        RawNotifyEvent::SUB_TYPE_HONOR => OneBotEventKind::Honor(event),
        RawNotifyEvent::SUB_TYPE_LUCKY_KING => OneBotEventKind::LuckyKing(event),
        RawNotifyEvent::SUB_TYPE_POKE => {
            if event.group_id.is_none() {
                OneBotEventKind::PrivatePoke(event)
            } else if event.target_id == Some(event.self_id) {
                OneBotEventKind::BotSelfPoke(event)
            } else {
                OneBotEventKind::MemberPoke(event)
            }
        }
        _ => OneBotEventKind::Unsupported(RawEvent::Notify(event)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::segment::Segment;

    fn group_message(sub_type: &str) -> RawEvent {
        RawEvent::GroupMessage(RawGroupMessageEvent {
            time: 1,
            self_id: 10,
            sub_type: sub_type.into(),
            message_id: 1,
            group_id: 100,
            user_id: 20,
            anonymous: None,
            message: vec![Segment::text("hi")],
            raw_message: "hi".into(),
            font: 0,
            sender: Default::default(),
        })
    }

    fn notify(sub_type: &str, group_id: Option<i64>, target_id: Option<i64>) -> RawEvent {
        RawEvent::Notify(RawNotifyEvent {
            time: 1,
            self_id: 10,
            sub_type: sub_type.into(),
            group_id,
            user_id: 20,
            target_id,
            honor_type: None,
        })
    }

    #[test]
    fn test_group_message_sub_types() {
        let codec = SegmentCodec::default();
        assert!(matches!(
            classify(group_message("normal"), &codec),
            OneBotEventKind::NormalGroupMessage(_)
        ));
        assert!(matches!(
            classify(group_message("anonymous"), &codec),
            OneBotEventKind::AnonymousGroupMessage(_)
        ));
        assert!(matches!(
            classify(group_message("notice"), &codec),
            OneBotEventKind::NoticeGroupMessage(_)
        ));
        assert!(matches!(
            classify(group_message("whatever"), &codec),
            OneBotEventKind::DefaultGroupMessage(_)
        ));
    }

    #[test]
    fn test_poke_split() {
        let codec = SegmentCodec::default();
        assert!(matches!(
            classify(notify("poke", None, Some(10)), &codec),
            OneBotEventKind::PrivatePoke(_)
        ));
        assert!(matches!(
            classify(notify("poke", Some(1), Some(10)), &codec),
            OneBotEventKind::BotSelfPoke(_)
        ));
        assert!(matches!(
            classify(notify("poke", Some(1), Some(30)), &codec),
            OneBotEventKind::MemberPoke(_)
        ));
        assert!(matches!(
            classify(notify("honor", Some(1), None), &codec),
            OneBotEventKind::Honor(_)
        ));
        assert!(matches!(
            classify(notify("title", Some(1), None), &codec),
            OneBotEventKind::Unsupported(RawEvent::Notify(_))
        ));
    }

    #[test]
    fn test_extra_shapes_are_unsupported() {
        let codec = SegmentCodec::default();
        let raw = RawEvent::GroupCard(RawGroupCardEvent {
            time: 1,
            self_id: 10,
            group_id: 1,
            user_id: 2,
            card_new: "a".into(),
            card_old: "b".into(),
        });
        assert!(matches!(
            classify(raw, &codec),
            OneBotEventKind::Unsupported(RawEvent::GroupCard(_))
        ));
    }
}
