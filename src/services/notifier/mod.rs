pub mod mail;

use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Outbound client notifications. Fire-and-forget: callers log failures and
/// never let them affect the operation they follow.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_confirmation(
        &self,
        client_id: &str,
        service_name: &str,
        barber_name: &str,
        start: NaiveDateTime,
    ) -> anyhow::Result<()>;

    async fn notify_cancellation(
        &self,
        client_id: &str,
        service_name: &str,
        start: NaiveDateTime,
    ) -> anyhow::Result<()>;

    async fn notify_reprogram(
        &self,
        client_id: &str,
        service_name: &str,
        new_start: NaiveDateTime,
    ) -> anyhow::Result<()>;

    async fn notify_reminder(&self, client_id: &str, start: NaiveDateTime) -> anyhow::Result<()>;
}

/// Fallback when no mail endpoint is configured: just logs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_confirmation(
        &self,
        client_id: &str,
        service_name: &str,
        barber_name: &str,
        start: NaiveDateTime,
    ) -> anyhow::Result<()> {
        tracing::info!(%client_id, service_name, barber_name, %start, "confirmation notification");
        Ok(())
    }

    async fn notify_cancellation(
        &self,
        client_id: &str,
        service_name: &str,
        start: NaiveDateTime,
    ) -> anyhow::Result<()> {
        tracing::info!(%client_id, service_name, %start, "cancellation notification");
        Ok(())
    }

    async fn notify_reprogram(
        &self,
        client_id: &str,
        service_name: &str,
        new_start: NaiveDateTime,
    ) -> anyhow::Result<()> {
        tracing::info!(%client_id, service_name, %new_start, "reprogram notification");
        Ok(())
    }

    async fn notify_reminder(&self, client_id: &str, start: NaiveDateTime) -> anyhow::Result<()> {
        tracing::info!(%client_id, %start, "reminder notification");
        Ok(())
    }
}
