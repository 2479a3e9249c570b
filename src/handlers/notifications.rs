use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::state::AppState;

use super::actor_from_headers;

#[derive(Serialize)]
pub struct NotificationResponse {
    id: i64,
    kind: String,
    title: String,
    body: String,
    created_at: String,
}

// GET /api/notifications
pub async fn my_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let actor = actor_from_headers(&headers)?;

    let db = state.db.lock().unwrap();
    let rows = queries::get_notifications_for_user(&db, &actor.id, 50)?;

    let response = rows
        .into_iter()
        .map(|n| NotificationResponse {
            id: n.id,
            kind: n.kind,
            title: n.title,
            body: n.body,
            created_at: n.created_at,
        })
        .collect();

    Ok(Json(response))
}
