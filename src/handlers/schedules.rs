use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{ActorRole, Slot};
use crate::services::duration::{slot_count, SLOT_MINUTES};
use crate::services::ledger;
use crate::state::AppState;

use super::actor_from_headers;

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {s}")))
}

// GET /api/schedules/:barber_id/:date
//
// The availability view: slot rows with `available` recomputed from the
// authoritative sources, so a stale cached flag never shows a bookable
// slot that is actually taken, past, or blocked.
pub async fn day_schedule(
    State(state): State<Arc<AppState>>,
    Path((barber_id, date)): Path<(String, String)>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let date = parse_date(&date)?;
    let now = Utc::now().naive_utc();

    let db = state.db.lock().unwrap();
    if queries::get_barber(&db, &barber_id)?.is_none() {
        return Err(AppError::NotFound(format!("barber {barber_id}")));
    }

    let slots = queries::get_slots_for_day(&db, &barber_id, date)?;
    let spans = queries::get_active_spans_for_day(&db, &barber_id, date)?;

    let view = slots
        .into_iter()
        .map(|slot| {
            let bucket = slot.date.and_time(slot.start_time);
            let past = bucket <= now;
            let reserved = spans.iter().any(|(start, minutes)| {
                (0..slot_count(*minutes)).any(|i| {
                    *start + chrono::Duration::minutes(i64::from(i * SLOT_MINUTES)) == bucket
                })
            });
            Slot {
                available: slot.available && !past && !reserved,
                ..slot
            }
        })
        .collect();

    Ok(Json(view))
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub barber_id: String,
    pub start_date: String,
    pub end_date: String,
}

// POST /api/schedules/generate
pub async fn generate_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = actor_from_headers(&headers)?;
    match actor.role {
        ActorRole::Admin => {}
        ActorRole::Barber if actor.id == req.barber_id => {}
        _ => return Err(AppError::Unauthorized),
    }

    let start_date = parse_date(&req.start_date)?;
    let end_date = parse_date(&req.end_date)?;
    if end_date < start_date {
        return Err(AppError::Validation(
            "end date is before start date".to_string(),
        ));
    }
    if end_date - start_date > chrono::Duration::days(90) {
        return Err(AppError::Validation(
            "date range is limited to 90 days".to_string(),
        ));
    }

    let db = state.db.lock().unwrap();
    if queries::get_barber(&db, &req.barber_id)?.is_none() {
        return Err(AppError::NotFound(format!("barber {}", req.barber_id)));
    }

    let generated = queries::generate_slots(
        &db,
        &req.barber_id,
        start_date,
        end_date,
        state.config.open_hour,
        state.config.close_hour,
    )?;

    tracing::info!(barber_id = %req.barber_id, generated, "slots generated");
    Ok(Json(serde_json::json!({ "generated": generated })))
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

// POST /api/slots/:slot_id/availability
pub async fn set_slot_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slot_id): Path<i64>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<Slot>, AppError> {
    let actor = actor_from_headers(&headers)?;

    let mut db = state.db.lock().unwrap();
    let slot = ledger::set_manual_block(&mut db, slot_id, &actor, !req.available)?;
    Ok(Json(slot))
}
