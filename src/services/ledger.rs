//! Reservation lifecycle. The only code allowed to mutate slot availability
//! and reservation status, and it always does both inside one immediate
//! transaction so a losing writer rolls back cleanly.

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, ActorRole, BarberStatus, Reservation, ReservationStatus, Slot};
use crate::services::{availability, duration, policy};
use crate::services::duration::SLOT_MINUTES;

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub client_id: String,
    pub barber_id: String,
    pub service_id: String,
    pub start: NaiveDateTime,
}

/// Books a service: validates input, then atomically re-checks the span and
/// claims it. Reservations are created directly as confirmed.
pub fn create(
    conn: &mut Connection,
    req: &CreateReservation,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    if req.start <= now {
        return Err(AppError::Validation(
            "reservations cannot be made in the past".to_string(),
        ));
    }

    let service = queries::get_service(conn, &req.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", req.service_id)))?;
    let barber = queries::get_barber(conn, &req.barber_id)?
        .ok_or_else(|| AppError::NotFound(format!("barber {}", req.barber_id)))?;
    if barber.status == BarberStatus::Inactive {
        return Err(AppError::Conflict("the barber is not available".to_string()));
    }

    let slots = duration::slot_count(service.duration_minutes);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let claims = availability::check_span(&tx, &req.barber_id, req.start, slots, now, None)?;

    let reservation = Reservation {
        id: Uuid::new_v4().to_string(),
        client_id: req.client_id.clone(),
        barber_id: req.barber_id.clone(),
        service_id: req.service_id.clone(),
        start_datetime: req.start,
        status: ReservationStatus::Confirmed,
        created_at: now,
        modified_at: now,
    };
    queries::insert_reservation(&tx, &reservation)?;
    for slot_id in &claims {
        queries::set_slot_available(&tx, *slot_id, false)?;
    }
    tx.commit()?;

    tracing::info!(
        reservation_id = %reservation.id,
        barber_id = %reservation.barber_id,
        start = %reservation.start_datetime,
        slots,
        "reservation created"
    );

    Ok(reservation)
}

/// Cancels a reservation and releases its slot span. Who may cancel, and
/// when, is decided by `policy::authorize_cancel`; cancellation is not
/// idempotent — cancelling twice is a state error.
pub fn cancel(
    conn: &mut Connection,
    reservation_id: &str,
    actor: &Actor,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let reservation = queries::get_reservation(&tx, reservation_id)?
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))?;
    check_ownership(&reservation, actor)?;

    let next = reservation.status.transition(ReservationStatus::Cancelled)?;
    policy::authorize_cancel(actor, reservation.start_datetime, now)?;

    let service = queries::get_service(&tx, &reservation.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", reservation.service_id)))?;
    let slots = duration::slot_count(service.duration_minutes);

    queries::update_reservation_status(&tx, &reservation.id, next, now)?;
    for bucket in span_buckets(reservation.start_datetime, slots) {
        queries::release_slot_bucket(&tx, &reservation.barber_id, bucket)?;
    }
    tx.commit()?;

    tracing::info!(
        reservation_id = %reservation.id,
        actor_role = ?actor.role,
        "reservation cancelled"
    );

    Ok(Reservation {
        status: next,
        modified_at: now,
        ..reservation
    })
}

/// Moves a confirmed reservation to a new start time. All-or-nothing: if any
/// slot of the new span is unavailable the reservation and its current slots
/// are left untouched.
pub fn reprogram(
    conn: &mut Connection,
    reservation_id: &str,
    new_start: NaiveDateTime,
    actor_id: &str,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    if new_start <= now {
        return Err(AppError::Validation(
            "reservations cannot be moved into the past".to_string(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let reservation = queries::get_reservation(&tx, reservation_id)?
        .filter(|r| r.client_id == actor_id)
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))?;

    if reservation.status != ReservationStatus::Confirmed {
        return Err(AppError::State(format!(
            "only confirmed reservations can be reprogrammed, this one is {}",
            reservation.status.as_str()
        )));
    }

    // The window applies against the current start time.
    policy::authorize_reprogram(reservation.start_datetime, now)?;

    let service = queries::get_service(&tx, &reservation.service_id)?
        .ok_or_else(|| AppError::NotFound(format!("service {}", reservation.service_id)))?;
    let slots = duration::slot_count(service.duration_minutes);

    let claims = availability::check_span(
        &tx,
        &reservation.barber_id,
        new_start,
        slots,
        now,
        Some(&reservation.id),
    )?;

    for bucket in span_buckets(reservation.start_datetime, slots) {
        queries::release_slot_bucket(&tx, &reservation.barber_id, bucket)?;
    }
    for slot_id in &claims {
        queries::set_slot_available(&tx, *slot_id, false)?;
    }
    queries::update_reservation_start(&tx, &reservation.id, new_start, now)?;
    tx.commit()?;

    tracing::info!(
        reservation_id = %reservation.id,
        from = %reservation.start_datetime,
        to = %new_start,
        "reservation reprogrammed"
    );

    Ok(Reservation {
        start_datetime: new_start,
        modified_at: now,
        ..reservation
    })
}

/// Marks an appointment as done. Only the assigned barber may complete, and
/// only from confirmed. Slots are left alone, the time has already elapsed.
pub fn complete(
    conn: &mut Connection,
    reservation_id: &str,
    actor_barber_id: &str,
    now: NaiveDateTime,
) -> Result<Reservation, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let reservation = queries::get_reservation(&tx, reservation_id)?
        .filter(|r| r.barber_id == actor_barber_id)
        .ok_or_else(|| AppError::NotFound(format!("reservation {reservation_id}")))?;

    let next = reservation.status.transition(ReservationStatus::Completed)?;
    queries::update_reservation_status(&tx, &reservation.id, next, now)?;
    tx.commit()?;

    Ok(Reservation {
        status: next,
        modified_at: now,
        ..reservation
    })
}

/// Manual availability toggle (barber time off). Funnelled through the
/// ledger so nothing else writes the `available` flag; refused while an
/// active reservation holds the slot, in either direction.
pub fn set_manual_block(
    conn: &mut Connection,
    slot_id: i64,
    actor: &Actor,
    blocked: bool,
) -> Result<Slot, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let slot = queries::get_slot(&tx, slot_id)?
        .ok_or_else(|| AppError::NotFound(format!("slot {slot_id}")))?;

    match actor.role {
        ActorRole::Admin => {}
        ActorRole::Barber if slot.barber_id == actor.id => {}
        _ => return Err(AppError::NotFound(format!("slot {slot_id}"))),
    }

    let bucket = slot.date.and_time(slot.start_time);
    if queries::count_active_overlaps(&tx, &slot.barber_id, bucket, None)? > 0 {
        return Err(AppError::Conflict(
            "the slot is held by an active reservation".to_string(),
        ));
    }

    queries::set_slot_available(&tx, slot.id, !blocked)?;
    tx.commit()?;

    Ok(Slot {
        available: !blocked,
        ..slot
    })
}

fn check_ownership(reservation: &Reservation, actor: &Actor) -> Result<(), AppError> {
    let owns = match actor.role {
        ActorRole::Client => reservation.client_id == actor.id,
        ActorRole::Barber => reservation.barber_id == actor.id,
        ActorRole::Admin => true,
    };
    if owns {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("reservation {}", reservation.id)))
    }
}

fn span_buckets(start: NaiveDateTime, slots: i32) -> impl Iterator<Item = NaiveDateTime> {
    (0..slots).map(move |i| start + Duration::minutes(i64::from(i * SLOT_MINUTES)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::NaiveDate;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    // Fixed clock: slots exist on 2025-06-02 and 2025-06-03, 09:00-19:00.
    fn now() -> NaiveDateTime {
        dt("2025-06-01 08:00:00")
    }

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        conn.execute_batch(
            "INSERT INTO services (id, name, duration_minutes, price) VALUES
                ('svc-30', 'Classic cut', 30, 15.0),
                ('svc-45', 'Cut & beard', 45, 25.0);
             INSERT INTO barbers (id, name, status) VALUES
                ('barber-1', 'Luis', 'active'),
                ('barber-2', 'Marta', 'inactive');",
        )
        .unwrap();
        let from = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        queries::generate_slots(&conn, "barber-1", from, to, 9, 19).unwrap();
        conn
    }

    fn request(service_id: &str, start: &str) -> CreateReservation {
        CreateReservation {
            client_id: "client-1".to_string(),
            barber_id: "barber-1".to_string(),
            service_id: service_id.to_string(),
            start: dt(start),
        }
    }

    fn client(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            role: ActorRole::Client,
        }
    }

    fn admin() -> Actor {
        Actor {
            id: "admin-1".to_string(),
            role: ActorRole::Admin,
        }
    }

    fn slot_available(conn: &Connection, bucket: &str) -> bool {
        queries::get_slot_for_bucket(conn, "barber-1", dt(bucket))
            .unwrap()
            .unwrap()
            .available
    }

    #[test]
    fn test_create_claims_full_span() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-45", "2025-06-02 10:00:00"), now()).unwrap();

        assert_eq!(res.status, ReservationStatus::Confirmed);
        assert!(!slot_available(&conn, "2025-06-02 10:00:00"));
        assert!(!slot_available(&conn, "2025-06-02 10:30:00"));
        assert!(slot_available(&conn, "2025-06-02 11:00:00"));
    }

    #[test]
    fn test_create_rejects_past_start() {
        let mut conn = setup_db();
        let err = create(&mut conn, &request("svc-30", "2025-05-31 10:00:00"), now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_unknown_service_and_barber() {
        let mut conn = setup_db();
        let mut req = request("svc-30", "2025-06-02 14:00:00");
        req.service_id = "svc-missing".to_string();
        assert!(matches!(
            create(&mut conn, &req, now()).unwrap_err(),
            AppError::NotFound(_)
        ));

        let mut req = request("svc-30", "2025-06-02 14:00:00");
        req.barber_id = "barber-missing".to_string();
        assert!(matches!(
            create(&mut conn, &req, now()).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_create_inactive_barber_conflicts() {
        let mut conn = setup_db();
        let mut req = request("svc-30", "2025-06-02 14:00:00");
        req.barber_id = "barber-2".to_string();
        assert!(matches!(
            create(&mut conn, &req, now()).unwrap_err(),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn test_second_create_on_same_slot_conflicts() {
        let mut conn = setup_db();
        create(&mut conn, &request("svc-30", "2025-06-02 14:00:00"), now()).unwrap();

        let mut second = request("svc-30", "2025-06-02 14:00:00");
        second.client_id = "client-2".to_string();
        let err = create(&mut conn, &second, now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_overlapping_spans_conflict() {
        let mut conn = setup_db();
        // 45 min at 10:00 holds 10:00 and 10:30.
        create(&mut conn, &request("svc-45", "2025-06-02 10:00:00"), now()).unwrap();

        let err = create(&mut conn, &request("svc-30", "2025-06-02 10:30:00"), now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_cancel_releases_span_and_slots_rebookable() {
        let mut conn = setup_db();
        // 25h ahead of the fixed clock, so the client window allows it.
        let res = create(&mut conn, &request("svc-45", "2025-06-02 09:00:00"), now()).unwrap();

        cancel(&mut conn, &res.id, &client("client-1"), now()).unwrap();

        assert!(slot_available(&conn, "2025-06-02 09:00:00"));
        assert!(slot_available(&conn, "2025-06-02 09:30:00"));

        // The freed span accepts a new booking immediately.
        let mut again = request("svc-45", "2025-06-02 09:00:00");
        again.client_id = "client-2".to_string();
        assert!(create(&mut conn, &again, now()).is_ok());
    }

    #[test]
    fn test_cancel_inside_window_is_policy_violation() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        let late = dt("2025-06-01 10:00:00"); // start is now 23h away
        let err = cancel(&mut conn, &res.id, &client("client-1"), late).unwrap_err();
        assert!(matches!(err, AppError::Policy(_)));

        // Nothing changed.
        assert!(!slot_available(&conn, "2025-06-02 09:00:00"));
        let reloaded = queries::get_reservation(&conn, &res.id).unwrap().unwrap();
        assert_eq!(reloaded.status, ReservationStatus::Confirmed);
    }

    #[test]
    fn test_admin_cancel_bypasses_window() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        // One hour before the appointment.
        let late = dt("2025-06-02 08:00:00");
        cancel(&mut conn, &res.id, &admin(), late).unwrap();

        assert!(slot_available(&conn, "2025-06-02 09:00:00"));
    }

    #[test]
    fn test_barber_cancel_bypasses_window() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        let barber = Actor {
            id: "barber-1".to_string(),
            role: ActorRole::Barber,
        };
        let late = dt("2025-06-02 08:00:00");
        cancel(&mut conn, &res.id, &barber, late).unwrap();
    }

    #[test]
    fn test_cancel_twice_is_state_error() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        cancel(&mut conn, &res.id, &client("client-1"), now()).unwrap();
        let err = cancel(&mut conn, &res.id, &client("client-1"), now()).unwrap_err();
        assert!(matches!(err, AppError::State(_)));

        // No double release: the span stays rebookable exactly once.
        assert!(create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).is_ok());
    }

    #[test]
    fn test_cancel_by_non_owner_is_not_found() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        let err = cancel(&mut conn, &res.id, &client("client-2"), now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_reprogram_moves_whole_span() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-45", "2025-06-02 10:00:00"), now()).unwrap();

        let moved = reprogram(
            &mut conn,
            &res.id,
            dt("2025-06-03 15:00:00"),
            "client-1",
            now(),
        )
        .unwrap();
        assert_eq!(moved.start_datetime, dt("2025-06-03 15:00:00"));

        assert!(slot_available(&conn, "2025-06-02 10:00:00"));
        assert!(slot_available(&conn, "2025-06-02 10:30:00"));
        assert!(!slot_available(&conn, "2025-06-03 15:00:00"));
        assert!(!slot_available(&conn, "2025-06-03 15:30:00"));
    }

    #[test]
    fn test_reprogram_to_adjacent_overlapping_span() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-45", "2025-06-02 10:00:00"), now()).unwrap();

        // New span 10:30-11:30 overlaps the old 10:00-11:00 span; the
        // reservation's own claim must not count as a conflict.
        reprogram(
            &mut conn,
            &res.id,
            dt("2025-06-02 10:30:00"),
            "client-1",
            now(),
        )
        .unwrap();

        assert!(slot_available(&conn, "2025-06-02 10:00:00"));
        assert!(!slot_available(&conn, "2025-06-02 10:30:00"));
        assert!(!slot_available(&conn, "2025-06-02 11:00:00"));
    }

    #[test]
    fn test_failed_reprogram_changes_nothing() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-45", "2025-06-02 10:00:00"), now()).unwrap();

        // Another client holds 15:00-15:30 on the target day.
        let mut other = request("svc-30", "2025-06-03 15:00:00");
        other.client_id = "client-2".to_string();
        create(&mut conn, &other, now()).unwrap();

        let err = reprogram(
            &mut conn,
            &res.id,
            dt("2025-06-03 15:00:00"),
            "client-1",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Original reservation and both slot spans are untouched.
        let reloaded = queries::get_reservation(&conn, &res.id).unwrap().unwrap();
        assert_eq!(reloaded.start_datetime, dt("2025-06-02 10:00:00"));
        assert!(!slot_available(&conn, "2025-06-02 10:00:00"));
        assert!(!slot_available(&conn, "2025-06-02 10:30:00"));
    }

    #[test]
    fn test_reprogram_inside_window_is_policy_violation() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        let late = dt("2025-06-01 10:00:00"); // 23h before the current start
        let err = reprogram(
            &mut conn,
            &res.id,
            dt("2025-06-03 15:00:00"),
            "client-1",
            late,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Policy(_)));
    }

    #[test]
    fn test_reprogram_cancelled_is_state_error() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();
        cancel(&mut conn, &res.id, &client("client-1"), now()).unwrap();

        let err = reprogram(
            &mut conn,
            &res.id,
            dt("2025-06-03 15:00:00"),
            "client-1",
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[test]
    fn test_complete_by_assigned_barber() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        let done = complete(&mut conn, &res.id, "barber-1", dt("2025-06-02 09:40:00")).unwrap();
        assert_eq!(done.status, ReservationStatus::Completed);
    }

    #[test]
    fn test_complete_by_other_barber_is_not_found() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();

        let err = complete(&mut conn, &res.id, "barber-2", now()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let reloaded = queries::get_reservation(&conn, &res.id).unwrap().unwrap();
        assert_eq!(reloaded.status, ReservationStatus::Confirmed);
    }

    #[test]
    fn test_complete_twice_is_state_error() {
        let mut conn = setup_db();
        let res = create(&mut conn, &request("svc-30", "2025-06-02 09:00:00"), now()).unwrap();
        complete(&mut conn, &res.id, "barber-1", now()).unwrap();

        let err = complete(&mut conn, &res.id, "barber-1", now()).unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[test]
    fn test_no_overlapping_active_reservations_invariant() {
        let mut conn = setup_db();
        create(&mut conn, &request("svc-45", "2025-06-02 10:00:00"), now()).unwrap();
        let mut second = request("svc-45", "2025-06-02 10:30:00");
        second.client_id = "client-2".to_string();
        assert!(create(&mut conn, &second, now()).is_err());

        // Every half-hour bucket of the day is covered by at most one
        // active reservation.
        for minutes in (9 * 60..19 * 60).step_by(30) {
            let bucket = dt("2025-06-02 00:00:00")
                + Duration::minutes(i64::from(minutes as i32));
            let held = queries::count_active_overlaps(&conn, "barber-1", bucket, None).unwrap();
            assert!(held <= 1, "bucket {bucket} held by {held} reservations");
        }
    }

    #[test]
    fn test_manual_block_and_unblock() {
        let mut conn = setup_db();
        let barber = Actor {
            id: "barber-1".to_string(),
            role: ActorRole::Barber,
        };
        let slot = queries::get_slot_for_bucket(&conn, "barber-1", dt("2025-06-02 12:00:00"))
            .unwrap()
            .unwrap();

        let blocked = set_manual_block(&mut conn, slot.id, &barber, true).unwrap();
        assert!(!blocked.available);

        let err = create(&mut conn, &request("svc-30", "2025-06-02 12:00:00"), now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        set_manual_block(&mut conn, slot.id, &barber, false).unwrap();
        assert!(create(&mut conn, &request("svc-30", "2025-06-02 12:00:00"), now()).is_ok());
    }

    #[test]
    fn test_manual_block_refused_on_reserved_slot() {
        let mut conn = setup_db();
        create(&mut conn, &request("svc-30", "2025-06-02 12:00:00"), now()).unwrap();

        let barber = Actor {
            id: "barber-1".to_string(),
            role: ActorRole::Barber,
        };
        let slot = queries::get_slot_for_bucket(&conn, "barber-1", dt("2025-06-02 12:00:00"))
            .unwrap()
            .unwrap();
        let err = set_manual_block(&mut conn, slot.id, &barber, true).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_manual_block_by_other_barber_is_not_found() {
        let mut conn = setup_db();
        let other = Actor {
            id: "barber-2".to_string(),
            role: ActorRole::Barber,
        };
        let slot = queries::get_slot_for_bucket(&conn, "barber-1", dt("2025-06-02 12:00:00"))
            .unwrap()
            .unwrap();
        let err = set_manual_block(&mut conn, slot.id, &other, true).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
