//! Group-key derivation for the live registry.
//!
//! A chat thread between two users always resolves to the same key no matter
//! who opens it; a user's notification stream has its own per-user key.

/// Canonical thread key for a pair of participants: `chat_{lo}_{hi}`.
pub fn thread_key(a: i64, b: i64) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("chat_{}_{}", lo, hi)
}

/// Group key for a user's notification stream: `notif_{user_id}`.
pub fn notification_group(user_id: i64) -> String {
    format!("notif_{}", user_id)
}
