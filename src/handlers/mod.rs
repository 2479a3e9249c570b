pub mod health;
pub mod notifications;
pub mod reservations;
pub mod schedules;

use axum::http::HeaderMap;
use chrono::NaiveDateTime;

use crate::errors::AppError;
use crate::models::{Actor, ActorRole};

/// Resolves the caller from the identity headers set by the upstream auth
/// layer. This service trusts them and does not re-derive identity.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .and_then(ActorRole::parse)
        .ok_or(AppError::Unauthorized)?;

    Ok(Actor {
        id: id.to_string(),
        role,
    })
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|_| AppError::Validation(format!("invalid datetime: {s}")))
}
