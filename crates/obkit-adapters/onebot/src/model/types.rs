//! Shared protocol types.

use serde::{Deserialize, Serialize};

/// Sender of a message event.
///
/// Implementations fill in different subsets, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sender {
    pub user_id: Option<i64>,
    pub nickname: Option<String>,
    /// `male`, `female` or `unknown`.
    pub sex: Option<String>,
    pub age: Option<i32>,
    /// Group card.
    pub card: Option<String>,
    pub area: Option<String>,
    pub level: Option<String>,
    /// `owner`, `admin` or `member`.
    pub role: Option<String>,
    pub title: Option<String>,
}

impl Sender {
    /// Returns the group card when set, otherwise the nickname.
    pub fn display_name(&self) -> Option<&str> {
        self.card
            .as_deref()
            .filter(|card| !card.is_empty())
            .or(self.nickname.as_deref())
    }
}

/// Anonymous identity of a group message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anonymous {
    pub id: i64,
    pub name: String,
    /// Token used to mute the anonymous member.
    pub flag: String,
}
