//! Request events (`post_type = request`, keyed by `request_type`).

use serde::{Deserialize, Serialize};

/// `request.friend`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFriendRequestEvent {
    pub time: i64,
    pub self_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub comment: String,
    /// Token passed back to `set_friend_add_request`.
    pub flag: String,
}

/// `request.group`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGroupRequestEvent {
    pub time: i64,
    pub self_id: i64,
    /// `add` or `invite`.
    pub sub_type: String,
    pub group_id: i64,
    pub user_id: i64,
    #[serde(default)]
    pub comment: String,
    pub flag: String,
}
