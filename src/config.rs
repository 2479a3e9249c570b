use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    /// HTTP mail API endpoint; empty disables outbound email.
    pub mailer_url: String,
    pub mailer_token: String,
    /// Business hours used by the slot generation routine.
    pub open_hour: u32,
    pub close_hour: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barberbook.db".to_string()),
            mailer_url: env::var("MAILER_URL").unwrap_or_default(),
            mailer_token: env::var("MAILER_TOKEN").unwrap_or_default(),
            open_hour: env::var("OPEN_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9),
            close_hour: env::var("CLOSE_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(19),
        }
    }
}
