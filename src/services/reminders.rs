use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use crate::db::queries;
use crate::state::AppState;

/// Hourly sweep that reminds clients of confirmed reservations starting
/// 24 to 25 hours out. The one-hour window matches the sweep period, so
/// each reservation is picked up exactly once.
pub async fn run_reminder_loop(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(StdDuration::from_secs(3600));
    loop {
        interval.tick().await;
        if let Err(e) = sweep(&state).await {
            tracing::warn!("reminder sweep failed: {e:#}");
        }
    }
}

async fn sweep(state: &Arc<AppState>) -> anyhow::Result<()> {
    let now = Utc::now().naive_utc();
    let due = {
        let db = state.db.lock().unwrap();
        queries::get_confirmed_in_window(&db, now + Duration::hours(24), now + Duration::hours(25))?
    };

    for reservation in due {
        if let Err(e) = state
            .notifier
            .notify_reminder(&reservation.client_id, reservation.start_datetime)
            .await
        {
            tracing::warn!(
                reservation_id = %reservation.id,
                "failed to send reminder: {e:#}"
            );
        }
    }

    Ok(())
}
