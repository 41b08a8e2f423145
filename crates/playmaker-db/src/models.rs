//! Database row types — these map directly to SQLite rows.
//! Distinct from the playmaker-types wire models to keep the DB layer
//! independent.

use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub profile_photo: Option<String>,
    pub created_at: String,
}

pub struct ChatMessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub thread_name: String,
    pub body: Option<String>,
    pub read: bool,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: i64,
    pub sender_id: Option<i64>,
    pub receiver_id: i64,
    pub kind: String,
    pub text: Option<String>,
    pub link: Option<String>,
    pub seen: bool,
    pub created_at: String,
}

/// Parse a SQLite timestamp column into a UTC datetime.
///
/// SQLite stores `datetime('now')` as "YYYY-MM-DD HH:MM:SS" without a
/// timezone; rows written by other tools may carry RFC 3339 instead.
pub fn parse_timestamp(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            chrono::DateTime::default()
        })
}
