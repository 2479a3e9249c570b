use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::duration::SLOT_MINUTES;

/// Verifies that a contiguous run of slots is free and returns their ids in
/// claim order.
///
/// For each half-hour bucket of the span this confirms that a slot row
/// exists, that the bucket is not in the past, that no active reservation
/// other than `exclude_reservation` covers it, and that it is not manually
/// blocked. The first failing bucket aborts with a `Conflict` naming its
/// 1-based position in the span.
///
/// The claiming transaction must call this again right before mutating:
/// a pre-check outside the transaction can be invalidated by a concurrent
/// commit.
pub fn check_span(
    conn: &Connection,
    barber_id: &str,
    start: NaiveDateTime,
    slot_count: i32,
    now: NaiveDateTime,
    exclude_reservation: Option<&str>,
) -> Result<Vec<i64>, AppError> {
    let mut claims = Vec::with_capacity(slot_count as usize);

    for i in 0..slot_count {
        let position = i + 1;
        let bucket = start + Duration::minutes(i64::from(i * SLOT_MINUTES));

        if bucket <= now {
            return Err(AppError::Conflict(format!(
                "slot {position} of the requested time is already in the past"
            )));
        }

        let slot = queries::get_slot_for_bucket(conn, barber_id, bucket)?.ok_or_else(|| {
            AppError::Conflict(format!(
                "no slot exists for slot {position} of the requested time"
            ))
        })?;

        // Authoritative check: active reservations, not the cached flag.
        let held_by_other =
            queries::count_active_overlaps(conn, barber_id, bucket, exclude_reservation)?;
        if held_by_other > 0 {
            return Err(AppError::Conflict(format!(
                "slot {position} of the requested time is already reserved"
            )));
        }

        if !slot.available {
            // Unavailable with no active reservation behind it means the
            // barber blocked the slot manually; held only by the excluded
            // reservation means it is ours to move.
            let held_at_all = match exclude_reservation {
                Some(_) => queries::count_active_overlaps(conn, barber_id, bucket, None)?,
                None => held_by_other,
            };
            if held_at_all == 0 {
                return Err(AppError::Conflict(format!(
                    "slot {position} of the requested time is blocked"
                )));
            }
        }

        claims.push(slot.id);
    }

    Ok(claims)
}
