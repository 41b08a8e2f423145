use serde::{Deserialize, Serialize};

use crate::events::ChatPayload;
use crate::models::UserPublic;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and anything else that
/// validates tokens. Tokens are issued by an external auth subsystem; the
/// pipeline only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Thread resolution --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveThreadRequest {
    pub sender_id: i64,
    pub receiver_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ResolveThreadResponse {
    pub thread_name: String,
}

// -- Chat history --

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub data: Vec<ChatPayload>,
    pub has_previous: bool,
    pub total_pages: u64,
    pub current_page: u64,
}

pub type ChatPartner = UserPublic;

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct UnseenCountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub sender: Option<i64>,
    pub text: Option<String>,
    pub link: Option<String>,
    pub seen: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub notification_type: String,
}
