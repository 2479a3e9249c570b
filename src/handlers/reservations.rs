use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{ActorRole, Reservation};
use crate::services::ledger;
use crate::state::AppState;

use super::{actor_from_headers, parse_datetime};

// Display-name lookups for notifications run after the reservation has
// committed, so a failure here must not turn the response into an error.
fn service_name(db: &rusqlite::Connection, id: &str) -> String {
    queries::get_service(db, id)
        .unwrap_or_else(|e| {
            tracing::warn!("failed to load service for notification: {e}");
            None
        })
        .map(|s| s.name)
        .unwrap_or_default()
}

fn barber_name(db: &rusqlite::Connection, id: &str) -> String {
    queries::get_barber(db, id)
        .unwrap_or_else(|e| {
            tracing::warn!("failed to load barber for notification: {e}");
            None
        })
        .map(|b| b.name)
        .unwrap_or_default()
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub barber_id: String,
    pub service_id: String,
    pub start_datetime: String,
}

// POST /api/reservations
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let actor = actor_from_headers(&headers)?;
    let start = parse_datetime(&req.start_datetime)?;
    let now = Utc::now().naive_utc();

    let input = ledger::CreateReservation {
        client_id: actor.id,
        barber_id: req.barber_id,
        service_id: req.service_id,
        start,
    };

    let (reservation, service_name, barber_name) = {
        let mut db = state.db.lock().unwrap();
        let reservation = ledger::create(&mut db, &input, now)?;

        let service_name = service_name(&db, &reservation.service_id);
        let barber_name = barber_name(&db, &reservation.barber_id);

        if let Err(e) = queries::insert_notification(
            &db,
            &reservation.client_id,
            "reservation_confirmed",
            "Reservation confirmed",
            "Your reservation has been confirmed",
        ) {
            tracing::warn!("failed to record web notification: {e}");
        }

        (reservation, service_name, barber_name)
    };

    let notifier = Arc::clone(&state.notifier);
    let r = reservation.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier
            .notify_confirmation(&r.client_id, &service_name, &barber_name, r.start_datetime)
            .await
        {
            tracing::warn!(reservation_id = %r.id, "failed to send confirmation: {e:#}");
        }
    });

    Ok((StatusCode::CREATED, Json(reservation)))
}

// POST /api/reservations/:id/cancel
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let now = Utc::now().naive_utc();

    let (reservation, service_name) = {
        let mut db = state.db.lock().unwrap();
        let reservation = ledger::cancel(&mut db, &id, &actor, now)?;

        let service_name = service_name(&db, &reservation.service_id);

        let body = if actor.role == ActorRole::Barber {
            "Your reservation has been cancelled by the barber due to unforeseen circumstances"
        } else {
            "Your reservation has been cancelled"
        };
        if let Err(e) = queries::insert_notification(
            &db,
            &reservation.client_id,
            "reservation_cancelled",
            "Reservation cancelled",
            body,
        ) {
            tracing::warn!("failed to record web notification: {e}");
        }

        (reservation, service_name)
    };

    let notifier = Arc::clone(&state.notifier);
    let r = reservation.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier
            .notify_cancellation(&r.client_id, &service_name, r.start_datetime)
            .await
        {
            tracing::warn!(reservation_id = %r.id, "failed to send cancellation: {e:#}");
        }
    });

    Ok(Json(
        serde_json::json!({ "message": "reservation cancelled" }),
    ))
}

#[derive(Deserialize)]
pub struct ReprogramRequest {
    pub new_start_datetime: String,
}

// POST /api/reservations/:id/reprogram
pub async fn reprogram_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ReprogramRequest>,
) -> Result<Json<Reservation>, AppError> {
    let actor = actor_from_headers(&headers)?;
    let new_start = parse_datetime(&req.new_start_datetime)?;
    let now = Utc::now().naive_utc();

    let (reservation, service_name) = {
        let mut db = state.db.lock().unwrap();
        let reservation = ledger::reprogram(&mut db, &id, new_start, &actor.id, now)?;

        let service_name = service_name(&db, &reservation.service_id);

        if let Err(e) = queries::insert_notification(
            &db,
            &reservation.client_id,
            "reservation_reprogrammed",
            "Reservation rescheduled",
            "Your reservation has been rescheduled",
        ) {
            tracing::warn!("failed to record web notification: {e}");
        }

        (reservation, service_name)
    };

    let notifier = Arc::clone(&state.notifier);
    let r = reservation.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier
            .notify_reprogram(&r.client_id, &service_name, r.start_datetime)
            .await
        {
            tracing::warn!(reservation_id = %r.id, "failed to send reprogram notice: {e:#}");
        }
    });

    Ok(Json(reservation))
}

// POST /api/reservations/:id/complete
pub async fn complete_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Reservation>, AppError> {
    let actor = actor_from_headers(&headers)?;
    if actor.role != ActorRole::Barber {
        return Err(AppError::Unauthorized);
    }
    let now = Utc::now().naive_utc();

    let mut db = state.db.lock().unwrap();
    let reservation = ledger::complete(&mut db, &id, &actor.id, now)?;
    Ok(Json(reservation))
}

// GET /api/reservations/mine
pub async fn my_reservations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let actor = actor_from_headers(&headers)?;

    let db = state.db.lock().unwrap();
    let reservations = match actor.role {
        ActorRole::Client => queries::get_reservations_for_client(&db, &actor.id)?,
        ActorRole::Barber => queries::get_reservations_for_barber(&db, &actor.id)?,
        ActorRole::Admin => queries::list_reservations(&db)?,
    };
    Ok(Json(reservations))
}

// GET /api/reservations (admin)
pub async fn all_reservations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let actor = actor_from_headers(&headers)?;
    if actor.role != ActorRole::Admin {
        return Err(AppError::Unauthorized);
    }

    let db = state.db.lock().unwrap();
    Ok(Json(queries::list_reservations(&db)?))
}
