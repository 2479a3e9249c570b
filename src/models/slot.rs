use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One 30-minute calendar unit for one barber on one date.
///
/// `available` is a cached hint: it is false while a reservation holds the
/// slot or while the barber has blocked it manually. The authoritative
/// occupancy check is against active reservations (see `services::availability`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    pub barber_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub available: bool,
}
