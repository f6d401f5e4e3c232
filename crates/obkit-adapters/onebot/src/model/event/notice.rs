//! Notice events (`post_type = notice`, keyed by `notice_type`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File attached to a [`RawGroupUploadEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: i64,
    pub busid: i64,
}

/// `notice.group_upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupUploadEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub file: UploadedFile,
}

/// `notice.group_admin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupAdminEvent {
    pub time: i64,
    pub self_id: i64,
    /// `set` or `unset`.
    pub sub_type: String,
    pub group_id: i64,
    pub user_id: i64,
}

/// `notice.group_decrease`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupDecreaseEvent {
    pub time: i64,
    pub self_id: i64,
    /// `leave`, `kick` or `kick_me`.
    pub sub_type: String,
    pub group_id: i64,
    /// Equals `user_id` when the member left on its own.
    #[serde(default)]
    pub operator_id: i64,
    pub user_id: i64,
}

/// `notice.group_increase`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupIncreaseEvent {
    pub time: i64,
    pub self_id: i64,
    /// `approve` or `invite`.
    pub sub_type: String,
    pub group_id: i64,
    #[serde(default)]
    pub operator_id: i64,
    pub user_id: i64,
}

/// `notice.group_ban`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupBanEvent {
    pub time: i64,
    pub self_id: i64,
    /// `ban` or `lift_ban`.
    pub sub_type: String,
    pub group_id: i64,
    pub operator_id: i64,
    /// `0` for a whole-group ban.
    pub user_id: i64,
    /// Seconds.
    #[serde(default)]
    pub duration: i64,
}

/// `notice.friend_add`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFriendAddEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
}

/// `notice.group_recall`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupRecallEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub operator_id: i64,
    pub message_id: i64,
}

/// `notice.friend_recall`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFriendRecallEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

/// `notice.notify`: pokes, lucky king and honor changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNotifyEvent {
    pub time: i64,
    pub self_id: i64,
    /// `poke`, `lucky_king` or `honor`.
    pub sub_type: String,
    /// Absent for pokes in a private chat.
    #[serde(default)]
    pub group_id: Option<i64>,
    pub user_id: i64,
    #[serde(default)]
    pub target_id: Option<i64>,
    /// `talkative`, `performer` or `emotion`.
    #[serde(default)]
    pub honor_type: Option<String>,
}

impl RawNotifyEvent {
    pub const SUB_TYPE_POKE: &'static str = "poke";
    pub const SUB_TYPE_LUCKY_KING: &'static str = "lucky_king";
    pub const SUB_TYPE_HONOR: &'static str = "honor";
}

/// `notice.group_card`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupCardEvent {
    pub time: i64,
    pub self_id: i64,
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub card_new: String,
    #[serde(default)]
    pub card_old: String,
}

/// File of a [`RawOfflineFileEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineFile {
    pub name: String,
    pub size: i64,
    pub url: String,
}

/// `notice.offline_file`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOfflineFileEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
    pub file: OfflineFile,
}

/// `notice.client_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClientStatusEvent {
    pub time: i64,
    pub self_id: i64,
    #[serde(default)]
    pub client: Value,
    pub online: bool,
}

/// `notice.essence`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEssenceEvent {
    pub time: i64,
    pub self_id: i64,
    /// `add` or `delete`.
    pub sub_type: String,
    pub group_id: i64,
    pub sender_id: i64,
    pub operator_id: i64,
    pub message_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notify_poke_without_group() {
        let raw = json!({
            "time": 1, "self_id": 10, "post_type": "notice", "notice_type": "notify",
            "sub_type": "poke", "user_id": 20, "target_id": 10
        });
        let event: RawNotifyEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.group_id, None);
        assert_eq!(event.target_id, Some(10));
    }

    #[test]
    fn test_group_upload_requires_file() {
        let raw = json!({
            "time": 1, "self_id": 10, "group_id": 1, "user_id": 2
        });
        assert!(serde_json::from_value::<RawGroupUploadEvent>(raw).is_err());
    }
}
