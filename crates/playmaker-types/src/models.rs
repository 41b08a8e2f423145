use serde::{Deserialize, Serialize};

/// The kinds of notification the pipeline fans out.
///
/// Matches the set of events the triggering subsystems produce; stored as the
/// snake_case string in the notifications table and emitted as the `type`
/// field on push frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Message,
    FriendRequest,
    FriendRequestAccept,
    Follow,
    NewPost,
    NewTrial,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::FriendRequest => "friend_request",
            Self::FriendRequestAccept => "friend_request_accept",
            Self::Follow => "follow",
            Self::NewPost => "new_post",
            Self::NewTrial => "new_trial",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "friend_request" => Some(Self::FriendRequest),
            "friend_request_accept" => Some(Self::FriendRequestAccept),
            "follow" => Some(Self::Follow),
            "new_post" => Some(Self::NewPost),
            "new_trial" => Some(Self::NewTrial),
            _ => None,
        }
    }
}

/// Public profile fields embedded in chat payloads and partner lists.
/// The full profile lives in an external subsystem; this is the slice the
/// pipeline serializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: i64,
    pub username: String,
    pub profile_photo: Option<String>,
}
