use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use barberbook::config::AppConfig;
use barberbook::db;
use barberbook::handlers;
use barberbook::services::notifier::mail::MailApiNotifier;
use barberbook::services::notifier::{LogNotifier, Notifier};
use barberbook::services::reminders;
use barberbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Arc<dyn Notifier> = if config.mailer_url.is_empty() {
        tracing::info!("no mail endpoint configured, notifications will only be logged");
        Arc::new(LogNotifier)
    } else {
        tracing::info!("using mail API at {}", config.mailer_url);
        Arc::new(MailApiNotifier::new(
            config.mailer_url.clone(),
            config.mailer_token.clone(),
        ))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
    });

    tokio::spawn(reminders::run_reminder_loop(Arc::clone(&state)));

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/reservations",
            post(handlers::reservations::create_reservation)
                .get(handlers::reservations::all_reservations),
        )
        .route(
            "/api/reservations/mine",
            get(handlers::reservations::my_reservations),
        )
        .route(
            "/api/reservations/:id/cancel",
            post(handlers::reservations::cancel_reservation),
        )
        .route(
            "/api/reservations/:id/reprogram",
            post(handlers::reservations::reprogram_reservation),
        )
        .route(
            "/api/reservations/:id/complete",
            post(handlers::reservations::complete_reservation),
        )
        .route(
            "/api/schedules/generate",
            post(handlers::schedules::generate_slots),
        )
        .route(
            "/api/slots/:slot_id/availability",
            post(handlers::schedules::set_slot_availability),
        )
        .route(
            "/api/schedules/:barber_id/:date",
            get(handlers::schedules::day_schedule),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::my_notifications),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
