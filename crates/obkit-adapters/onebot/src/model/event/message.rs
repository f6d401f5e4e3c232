//! Message events (`post_type = message`, keyed by `message_type`).

use serde::{Deserialize, Serialize};

use crate::model::segment::Segment;
use crate::model::types::{Anonymous, Sender};

/// `message.group`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupMessageEvent {
    pub time: i64,
    pub self_id: i64,
    /// `normal`, `anonymous` or `notice`.
    pub sub_type: String,
    pub message_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub anonymous: Option<Anonymous>,
    pub message: Vec<Segment>,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub font: i32,
    #[serde(default)]
    pub sender: Sender,
}

impl RawGroupMessageEvent {
    pub const SUB_TYPE_NORMAL: &'static str = "normal";
    pub const SUB_TYPE_ANONYMOUS: &'static str = "anonymous";
    pub const SUB_TYPE_NOTICE: &'static str = "notice";
}

/// `message.private`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrivateMessageEvent {
    pub time: i64,
    pub self_id: i64,
    /// `friend`, `group` or `other`.
    pub sub_type: String,
    pub message_id: i64,
    pub user_id: i64,
    pub message: Vec<Segment>,
    #[serde(default)]
    pub raw_message: String,
    #[serde(default)]
    pub font: i32,
    #[serde(default)]
    pub sender: Sender,
    /// Source group of a temporary session, when the implementation sends it.
    #[serde(default, alias = "temp_source")]
    pub group_id: Option<i64>,
}

impl RawPrivateMessageEvent {
    pub const SUB_TYPE_FRIEND: &'static str = "friend";
    pub const SUB_TYPE_GROUP: &'static str = "group";
}

/// Plain text of a segment list.
pub fn plain_text(message: &[Segment]) -> String {
    message.iter().filter_map(Segment::as_text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_message_decode() {
        let raw = json!({
            "time": 1700000000,
            "self_id": 10,
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "message_id": 5,
            "group_id": 100,
            "user_id": 20,
            "message": [
                {"type": "text", "data": {"text": "hi "}},
                {"type": "at", "data": {"qq": "10"}}
            ],
            "raw_message": "hi [CQ:at,qq=10]",
            "font": 0,
            "sender": {"user_id": 20, "nickname": "n", "role": "member"}
        });

        let event: RawGroupMessageEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.group_id, 100);
        assert_eq!(event.message.len(), 2);
        assert_eq!(plain_text(&event.message), "hi ");
        assert_eq!(event.sender.role.as_deref(), Some("member"));
    }

    #[test]
    fn test_private_message_temp_source() {
        let raw = json!({
            "time": 1, "self_id": 10, "sub_type": "group", "message_id": 1,
            "user_id": 2, "message": [], "temp_source": 300
        });
        let event: RawPrivateMessageEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.group_id, Some(300));
    }
}
