//! Meta events (`post_type = meta_event`, keyed by `meta_event_type`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `meta_event.lifecycle`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLifecycleEvent {
    pub time: i64,
    pub self_id: i64,
    /// `enable`, `disable` or `connect`.
    pub sub_type: String,
}

impl RawLifecycleEvent {
    pub const SUB_TYPE_ENABLE: &'static str = "enable";
    pub const SUB_TYPE_DISABLE: &'static str = "disable";
    pub const SUB_TYPE_CONNECT: &'static str = "connect";
}

/// `meta_event.heartbeat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHeartbeatEvent {
    pub time: i64,
    pub self_id: i64,
    /// Implementation-defined status object.
    #[serde(default)]
    pub status: Value,
    /// Milliseconds until the next heartbeat.
    pub interval: i64,
}
