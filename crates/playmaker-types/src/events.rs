use serde::{Deserialize, Serialize};

use crate::models::{NotificationKind, UserPublic};

/// Inbound frame on a chat socket: `{"message": ..., "sender": id, "receiver": id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatFrame {
    pub message: String,
    pub sender: i64,
    pub receiver: i64,
}

/// Serialized chat row pushed to every member of a thread group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub id: i64,
    pub sender: UserPublic,
    pub receiver: UserPublic,
    pub message: Option<String>,
    pub thread_name: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// Notification frame pushed to a user's `notif_{id}` group.
///
/// `message` is only present on chat-message notifications, mirroring the
/// extra field the chat path attaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPush {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub text: String,
    pub link: Option<String>,
}

/// Everything the dispatcher can push to a live connection.
///
/// An explicit union instead of stringly-typed event routing: adding a
/// variant forces every serialization site to handle it.
#[derive(Debug, Clone)]
pub enum Outbound {
    Chat(ChatPayload),
    Notification(NotificationPush),
}

impl Outbound {
    /// Serialize to the wire form. Chat frames are the bare chat row;
    /// notification frames carry their `type` tag.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Outbound::Chat(payload) => serde_json::to_string(payload),
            Outbound::Notification(push) => serde_json::to_string(push),
        }
    }
}
