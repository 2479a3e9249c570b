use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub client_id: String,
    pub barber_id: String,
    pub service_id: String,
    pub start_datetime: NaiveDateTime,
    pub status: ReservationStatus,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "confirmed" => ReservationStatus::Confirmed,
            "completed" => ReservationStatus::Completed,
            "cancelled" => ReservationStatus::Cancelled,
            _ => ReservationStatus::Pending,
        }
    }

    /// A reservation occupies its slots only while pending or confirmed.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Validates a state transition, returning the new status.
    ///
    /// Legal moves: pending -> confirmed, pending -> cancelled,
    /// confirmed -> completed, confirmed -> cancelled. Completed and
    /// cancelled are terminal.
    pub fn transition(self, next: ReservationStatus) -> Result<ReservationStatus, AppError> {
        use ReservationStatus::*;
        match (self, next) {
            (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Completed)
            | (Confirmed, Cancelled) => Ok(next),
            (from, to) => Err(AppError::State(format!(
                "cannot move reservation from {} to {}",
                from.as_str(),
                to.as_str()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Client,
    Barber,
    Admin,
}

impl ActorRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(ActorRole::Client),
            "barber" => Some(ActorRole::Barber),
            "admin" => Some(ActorRole::Admin),
            _ => None,
        }
    }
}

/// Identity resolved by the upstream auth layer. The ledger trusts it.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}
