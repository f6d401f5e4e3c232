//! Standard actions used by the engine and their result shapes.
//!
//! ```rust,ignore
//! let info = bot.execute_data(&actions::get_login_info()).await?;
//! let sent = bot
//!     .execute_data(&actions::send_group_msg(123, &MessageBody::text("hi"))?)
//!     .await?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::api::Action;
use crate::error::{ApiError, ApiResult};
use crate::model::segment::Segment;
use crate::model::types::Sender;

// ============================================================================
// Outgoing Message Body
// ============================================================================

/// The `message` parameter of the send actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    /// Plain text, sent with `auto_escape` so CQ codes are not parsed.
    Text(String),
    Segments(Vec<Segment>),
}

impl MessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<Vec<Segment>> for MessageBody {
    fn from(segments: Vec<Segment>) -> Self {
        Self::Segments(segments)
    }
}

#[derive(Serialize)]
struct SendMsgParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<i64>,
    message: &'a MessageBody,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    auto_escape: bool,
}

fn send_msg(
    name: &'static str,
    user_id: Option<i64>,
    group_id: Option<i64>,
    message: &MessageBody,
) -> ApiResult<Action<MessageIdResult>> {
    let params = SendMsgParams {
        user_id,
        group_id,
        message,
        auto_escape: message.is_text(),
    };
    let body = serde_json::to_value(&params).map_err(|source| ApiError::Decode {
        action: name.to_owned(),
        source,
    })?;
    Ok(Action::new(name, Some(body)))
}

// ============================================================================
// Actions
// ============================================================================

/// `send_private_msg`. A `group_id` makes it a temporary session.
pub fn send_private_msg(
    user_id: i64,
    group_id: Option<i64>,
    message: &MessageBody,
) -> ApiResult<Action<MessageIdResult>> {
    send_msg("send_private_msg", Some(user_id), group_id, message)
}

/// `send_group_msg`
pub fn send_group_msg(group_id: i64, message: &MessageBody) -> ApiResult<Action<MessageIdResult>> {
    send_msg("send_group_msg", None, Some(group_id), message)
}

/// `delete_msg`. The gateway answers with `data: null`.
pub fn delete_msg(message_id: i64) -> Action<Value> {
    Action::new("delete_msg", Some(json!({ "message_id": message_id })))
}

/// `get_msg`
pub fn get_msg(message_id: i64) -> Action<GetMsgResult> {
    Action::new("get_msg", Some(json!({ "message_id": message_id })))
}

/// `get_login_info`
pub fn get_login_info() -> Action<LoginInfo> {
    Action::new("get_login_info", None)
}

/// `get_version_info`
pub fn get_version_info() -> Action<VersionInfo> {
    Action::new("get_version_info", None)
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageIdResult {
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
}

/// Result of `get_version_info`; implementations add their own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub protocol_version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of `get_msg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMsgResult {
    #[serde(default)]
    pub time: i64,
    /// `private` or `group`.
    #[serde(default)]
    pub message_type: String,
    pub message_id: i64,
    #[serde(default)]
    pub real_id: i64,
    #[serde(default)]
    pub sender: Sender,
    pub message: Vec<Segment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_body_sets_auto_escape() {
        let action = send_group_msg(100, &MessageBody::text("[CQ:face,id=1]")).unwrap();
        assert_eq!(action.name(), "send_group_msg");
        assert_eq!(
            action.body().unwrap(),
            &json!({"group_id": 100, "message": "[CQ:face,id=1]", "auto_escape": true})
        );
    }

    #[test]
    fn test_segment_body_for_temp_session() {
        let body = MessageBody::from(vec![Segment::text("a"), Segment::face(1)]);
        let action = send_private_msg(20, Some(100), &body).unwrap();
        assert_eq!(
            action.body().unwrap(),
            &json!({
                "user_id": 20,
                "group_id": 100,
                "message": [
                    {"type": "text", "data": {"text": "a"}},
                    {"type": "face", "data": {"id": "1"}}
                ]
            })
        );
    }

    #[test]
    fn test_version_info_keeps_extra_fields() {
        let info: VersionInfo = serde_json::from_value(json!({
            "app_name": "LLOneBot",
            "app_version": "3.0",
            "protocol_version": "v11",
            "nt_protocol": "x"
        }))
        .unwrap();
        assert_eq!(info.app_name, "LLOneBot");
        assert_eq!(info.extra.get("nt_protocol"), Some(&json!("x")));
    }
}
