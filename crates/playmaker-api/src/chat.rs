use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use playmaker_db::models::parse_timestamp;
use playmaker_types::api::{
    ChatHistoryResponse, ChatPartner, Claims, ResolveThreadRequest, ResolveThreadResponse,
};
use playmaker_types::events::ChatPayload;
use playmaker_types::groups::thread_key;
use playmaker_types::models::UserPublic;

use crate::state::AppState;

const PER_PAGE: u64 = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "threadName")]
    pub thread_name: String,
    #[serde(default = "default_page")]
    pub page: u64,
}

fn default_page() -> u64 {
    1
}

/// Resolve (creating if absent) the canonical thread between two users.
/// A brand-new thread gets a bodyless placeholder row so it shows up in
/// partner lists before the first message.
pub async fn resolve_thread(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<ResolveThreadRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();

    let thread_name = run_blocking(move || {
        let sender = db
            .get_user(req.sender_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;
        let receiver = db
            .get_user(req.receiver_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        let thread_name = thread_key(sender.id, receiver.id);

        let exists = db
            .thread_has_messages(&thread_name)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if !exists {
            db.insert_chat_message(sender.id, receiver.id, &thread_name, None)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        Ok(thread_name)
    })
    .await?;

    Ok(Json(ResolveThreadResponse { thread_name }))
}

/// One page of thread history. Pages count back from the newest: page 1 is
/// the most recent page, and messages stay chronological within a page.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();

    let response = run_blocking(move || {
        let total = db
            .count_thread_messages(&query.thread_name)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let total_pages = total.div_ceil(PER_PAGE).max(1);

        if query.page < 1 || query.page > total_pages {
            return Err(StatusCode::NOT_FOUND);
        }

        let current_page = total_pages - query.page + 1;
        let offset = (current_page - 1) * PER_PAGE;

        let rows = db
            .get_thread_messages(&query.thread_name, PER_PAGE, offset)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        // Both participants at most; resolve once and reuse.
        let mut users: HashMap<i64, UserPublic> = HashMap::new();
        for row in &rows {
            for id in [row.sender_id, row.receiver_id] {
                if !users.contains_key(&id) {
                    let user = db
                        .get_user(id)
                        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                    users.insert(
                        id,
                        user.map(|u| UserPublic {
                            id: u.id,
                            username: u.username,
                            profile_photo: u.profile_photo,
                        })
                        .unwrap_or(UserPublic {
                            id,
                            username: "unknown".into(),
                            profile_photo: None,
                        }),
                    );
                }
            }
        }

        let data: Vec<ChatPayload> = rows
            .into_iter()
            .map(|row| ChatPayload {
                id: row.id,
                sender: users[&row.sender_id].clone(),
                receiver: users[&row.receiver_id].clone(),
                message: row.body,
                thread_name: row.thread_name,
                date: parse_timestamp(&row.created_at),
            })
            .collect();

        Ok(ChatHistoryResponse {
            data,
            has_previous: current_page > 1,
            total_pages,
            current_page,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Everyone the authenticated user has exchanged messages with.
pub async fn chat_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let partners = run_blocking(move || {
        let rows = db
            .chat_partners(user_id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok(rows
            .into_iter()
            .map(|u| ChatPartner {
                id: u.id,
                username: u.username,
                profile_photo: u.profile_photo,
            })
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(partners))
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, StatusCode>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StatusCode> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
}
