use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use playmaker_db::models::parse_timestamp;
use playmaker_types::api::{Claims, NotificationResponse, UnseenCountResponse};

use crate::chat::run_blocking;
use crate::state::AppState;

/// The authenticated user's notifications, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let receiver = claims.sub;

    let notifications = run_blocking(move || {
        let rows = db
            .list_notifications(receiver)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok(rows
            .into_iter()
            .map(|row| NotificationResponse {
                id: row.id,
                sender: row.sender_id,
                text: row.text,
                link: row.link,
                seen: row.seen,
                created_at: parse_timestamp(&row.created_at),
                notification_type: row.kind,
            })
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(notifications))
}

/// Unseen badge count.
pub async fn unseen_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let receiver = claims.sub;

    let count = run_blocking(move || {
        db.count_unseen_notifications(receiver)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await?;

    Ok(Json(UnseenCountResponse { count }))
}

/// Mark one notification seen. Scoped to the authenticated receiver; `seen`
/// only ever goes false to true.
pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let receiver = claims.sub;

    let updated = run_blocking(move || {
        db.mark_notification_seen(id, receiver)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await?;

    if updated {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

/// Mark every notification for the authenticated receiver seen.
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let receiver = claims.sub;

    run_blocking(move || {
        db.mark_all_notifications_seen(receiver)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await?;

    Ok(StatusCode::OK)
}

/// Delete one notification for the authenticated receiver.
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let receiver = claims.sub;

    let deleted = run_blocking(move || {
        db.delete_notification(id, receiver)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
