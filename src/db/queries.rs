use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Barber, BarberStatus, Reservation, ReservationStatus, ServiceSpec, Slot,
};

pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TIME_FMT: &str = "%H:%M:%S";

// ── Catalog (read-only) ──

pub fn get_service(conn: &Connection, id: &str) -> rusqlite::Result<Option<ServiceSpec>> {
    conn.query_row(
        "SELECT id, name, duration_minutes, price FROM services WHERE id = ?1",
        params![id],
        |row| {
            Ok(ServiceSpec {
                id: row.get(0)?,
                name: row.get(1)?,
                duration_minutes: row.get(2)?,
                price: row.get(3)?,
            })
        },
    )
    .optional()
}

pub fn get_barber(conn: &Connection, id: &str) -> rusqlite::Result<Option<Barber>> {
    conn.query_row(
        "SELECT id, name, status FROM barbers WHERE id = ?1",
        params![id],
        |row| {
            let status: String = row.get(2)?;
            Ok(Barber {
                id: row.get(0)?,
                name: row.get(1)?,
                status: BarberStatus::parse(&status),
            })
        },
    )
    .optional()
}

// ── Slots ──

/// Bulk slot generation: a 30-minute grid between open and close hours for
/// every day in the range, inclusive. Idempotent; existing rows are kept.
pub fn generate_slots(
    conn: &Connection,
    barber_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    open_hour: u32,
    close_hour: u32,
) -> rusqlite::Result<usize> {
    let mut inserted = 0;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO slots (barber_id, date, start_time, end_time, available)
         VALUES (?1, ?2, ?3, ?4, 1)",
    )?;

    let mut date = start_date;
    while date <= end_date {
        let mut minutes = open_hour * 60;
        while minutes + 30 <= close_hour * 60 {
            let start = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
                .unwrap_or(NaiveTime::MIN);
            let end_minutes = minutes + 30;
            let end = NaiveTime::from_hms_opt(end_minutes / 60, end_minutes % 60, 0)
                .unwrap_or(NaiveTime::MIN);

            inserted += stmt.execute(params![
                barber_id,
                date.format(DATE_FMT).to_string(),
                start.format(TIME_FMT).to_string(),
                end.format(TIME_FMT).to_string(),
            ])?;
            minutes += 30;
        }
        date += Duration::days(1);
    }

    Ok(inserted)
}

pub fn get_slot(conn: &Connection, id: i64) -> rusqlite::Result<Option<Slot>> {
    conn.query_row(
        "SELECT id, barber_id, date, start_time, end_time, available
         FROM slots WHERE id = ?1",
        params![id],
        parse_slot_row,
    )
    .optional()
}

/// Looks up the slot row for one half-hour bucket of a barber's day.
pub fn get_slot_for_bucket(
    conn: &Connection,
    barber_id: &str,
    bucket: NaiveDateTime,
) -> rusqlite::Result<Option<Slot>> {
    conn.query_row(
        "SELECT id, barber_id, date, start_time, end_time, available
         FROM slots WHERE barber_id = ?1 AND date = ?2 AND start_time = ?3",
        params![
            barber_id,
            bucket.date().format(DATE_FMT).to_string(),
            bucket.time().format(TIME_FMT).to_string(),
        ],
        parse_slot_row,
    )
    .optional()
}

pub fn get_slots_for_day(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Vec<Slot>> {
    let mut stmt = conn.prepare(
        "SELECT id, barber_id, date, start_time, end_time, available
         FROM slots WHERE barber_id = ?1 AND date = ?2 ORDER BY start_time",
    )?;
    let rows = stmt.query_map(
        params![barber_id, date.format(DATE_FMT).to_string()],
        parse_slot_row,
    )?;
    rows.collect()
}

pub fn set_slot_available(conn: &Connection, id: i64, available: bool) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE slots SET available = ?1 WHERE id = ?2",
        params![available as i32, id],
    )?;
    Ok(count > 0)
}

/// Releases the slot covering one half-hour bucket. Used when a cancellation
/// recomputes a reservation's span from its stored duration.
pub fn release_slot_bucket(
    conn: &Connection,
    barber_id: &str,
    bucket: NaiveDateTime,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE slots SET available = 1
         WHERE barber_id = ?1 AND date = ?2 AND start_time = ?3",
        params![
            barber_id,
            bucket.date().format(DATE_FMT).to_string(),
            bucket.time().format(TIME_FMT).to_string(),
        ],
    )
}

fn parse_slot_row(row: &rusqlite::Row) -> rusqlite::Result<Slot> {
    let date_str: String = row.get(2)?;
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;

    Ok(Slot {
        id: row.get(0)?,
        barber_id: row.get(1)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .unwrap_or_else(|_| Utc::now().date_naive()),
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FMT).unwrap_or(NaiveTime::MIN),
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FMT).unwrap_or(NaiveTime::MIN),
        available: row.get::<_, i32>(5)? != 0,
    })
}

// ── Reservations ──

pub fn insert_reservation(conn: &Connection, r: &Reservation) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO reservations (id, client_id, barber_id, service_id, start_datetime, status, created_at, modified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            r.id,
            r.client_id,
            r.barber_id,
            r.service_id,
            r.start_datetime.format(DATETIME_FMT).to_string(),
            r.status.as_str(),
            r.created_at.format(DATETIME_FMT).to_string(),
            r.modified_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_reservation(conn: &Connection, id: &str) -> rusqlite::Result<Option<Reservation>> {
    conn.query_row(
        "SELECT id, client_id, barber_id, service_id, start_datetime, status, created_at, modified_at
         FROM reservations WHERE id = ?1",
        params![id],
        parse_reservation_row,
    )
    .optional()
}

pub fn update_reservation_status(
    conn: &Connection,
    id: &str,
    status: ReservationStatus,
    now: NaiveDateTime,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE reservations SET status = ?1, modified_at = ?2 WHERE id = ?3",
        params![status.as_str(), now.format(DATETIME_FMT).to_string(), id],
    )?;
    Ok(())
}

pub fn update_reservation_start(
    conn: &Connection,
    id: &str,
    new_start: NaiveDateTime,
    now: NaiveDateTime,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE reservations SET start_datetime = ?1, modified_at = ?2 WHERE id = ?3",
        params![
            new_start.format(DATETIME_FMT).to_string(),
            now.format(DATETIME_FMT).to_string(),
            id
        ],
    )?;
    Ok(())
}

pub fn get_reservations_for_client(
    conn: &Connection,
    client_id: &str,
) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, barber_id, service_id, start_datetime, status, created_at, modified_at
         FROM reservations WHERE client_id = ?1 ORDER BY start_datetime DESC",
    )?;
    let rows = stmt.query_map(params![client_id], parse_reservation_row)?;
    rows.collect()
}

pub fn get_reservations_for_barber(
    conn: &Connection,
    barber_id: &str,
) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, barber_id, service_id, start_datetime, status, created_at, modified_at
         FROM reservations WHERE barber_id = ?1 ORDER BY start_datetime DESC",
    )?;
    let rows = stmt.query_map(params![barber_id], parse_reservation_row)?;
    rows.collect()
}

pub fn list_reservations(conn: &Connection) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, barber_id, service_id, start_datetime, status, created_at, modified_at
         FROM reservations ORDER BY start_datetime DESC",
    )?;
    let rows = stmt.query_map([], parse_reservation_row)?;
    rows.collect()
}

/// Counts active reservations whose slot span covers `bucket`, optionally
/// ignoring one reservation id. This is the authoritative occupancy check;
/// the `available` flag on slot rows is only a cache.
///
/// A reservation's span is ceil(duration/30) slots of 30 minutes, at least
/// one, computed here in SQL with the same rounding as
/// `services::duration::slot_count`.
pub fn count_active_overlaps(
    conn: &Connection,
    barber_id: &str,
    bucket: NaiveDateTime,
    exclude_reservation: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*)
         FROM reservations r
         JOIN services s ON r.service_id = s.id
         WHERE r.barber_id = ?1
           AND r.status IN ('pending', 'confirmed')
           AND r.start_datetime <= ?2
           AND datetime(r.start_datetime,
                        '+' || (MAX(1, (s.duration_minutes + 29) / 30) * 30) || ' minutes') > ?2
           AND (?3 IS NULL OR r.id <> ?3)",
        params![
            barber_id,
            bucket.format(DATETIME_FMT).to_string(),
            exclude_reservation,
        ],
        |row| row.get(0),
    )
}

/// Active reservations starting on the given date, with service durations.
/// Feeds the day availability view.
pub fn get_active_spans_for_day(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
) -> rusqlite::Result<Vec<(NaiveDateTime, i32)>> {
    let mut stmt = conn.prepare(
        "SELECT r.start_datetime, s.duration_minutes
         FROM reservations r
         JOIN services s ON r.service_id = s.id
         WHERE r.barber_id = ?1
           AND date(r.start_datetime) = ?2
           AND r.status IN ('pending', 'confirmed')",
    )?;
    let rows = stmt.query_map(
        params![barber_id, date.format(DATE_FMT).to_string()],
        |row| {
            let start_str: String = row.get(0)?;
            let duration: i32 = row.get(1)?;
            let start = NaiveDateTime::parse_from_str(&start_str, DATETIME_FMT)
                .unwrap_or_else(|_| Utc::now().naive_utc());
            Ok((start, duration))
        },
    )?;
    rows.collect()
}

/// Confirmed reservations starting inside [from, to). Feeds the reminder loop.
pub fn get_confirmed_in_window(
    conn: &Connection,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, barber_id, service_id, start_datetime, status, created_at, modified_at
         FROM reservations
         WHERE status = 'confirmed' AND start_datetime >= ?1 AND start_datetime < ?2
         ORDER BY start_datetime",
    )?;
    let rows = stmt.query_map(
        params![
            from.format(DATETIME_FMT).to_string(),
            to.format(DATETIME_FMT).to_string()
        ],
        parse_reservation_row,
    )?;
    rows.collect()
}

fn parse_reservation_row(row: &rusqlite::Row) -> rusqlite::Result<Reservation> {
    let start_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;
    let modified_str: String = row.get(7)?;

    Ok(Reservation {
        id: row.get(0)?,
        client_id: row.get(1)?,
        barber_id: row.get(2)?,
        service_id: row.get(3)?,
        start_datetime: NaiveDateTime::parse_from_str(&start_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        status: ReservationStatus::parse(&status_str),
        created_at: NaiveDateTime::parse_from_str(&created_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        modified_at: NaiveDateTime::parse_from_str(&modified_str, DATETIME_FMT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}

// ── Notifications ──

pub fn insert_notification(
    conn: &Connection,
    user_id: &str,
    kind: &str,
    title: &str,
    body: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, kind, title, body) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, kind, title, body],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct NotificationRow {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub created_at: String,
}

pub fn get_notifications_for_user(
    conn: &Connection,
    user_id: &str,
    limit: i64,
) -> rusqlite::Result<Vec<NotificationRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, title, body, created_at
         FROM notifications WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], |row| {
        Ok(NotificationRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            created_at: row.get(4)?,
        })
    })?;
    rows.collect()
}
