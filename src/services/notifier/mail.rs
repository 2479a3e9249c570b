use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::Notifier;

/// Delivers notifications through an HTTP mail API. The endpoint receives
/// `{to, subject, body}` and resolves the client id to an address itself.
pub struct MailApiNotifier {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl MailApiNotifier {
    pub fn new(url: String, token: String) -> Self {
        Self {
            url,
            token,
            client: reqwest::Client::new(),
        }
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await
            .context("failed to reach mail API")?
            .error_for_status()
            .context("mail API returned error")?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for MailApiNotifier {
    async fn notify_confirmation(
        &self,
        client_id: &str,
        service_name: &str,
        barber_name: &str,
        start: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Your reservation is confirmed.\n\nService: {service_name}\nBarber: {barber_name}\nWhen: {}\n\nYou can cancel or reschedule up to 24 hours before.",
            start.format("%Y-%m-%d %H:%M")
        );
        self.send(client_id, "Reservation confirmed", &body).await
    }

    async fn notify_cancellation(
        &self,
        client_id: &str,
        service_name: &str,
        start: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Your reservation has been cancelled.\n\nService: {service_name}\nWhen: {}\n\nYou can book again any time.",
            start.format("%Y-%m-%d %H:%M")
        );
        self.send(client_id, "Reservation cancelled", &body).await
    }

    async fn notify_reprogram(
        &self,
        client_id: &str,
        service_name: &str,
        new_start: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let body = format!(
            "Your reservation has been rescheduled.\n\nService: {service_name}\nNew time: {}",
            new_start.format("%Y-%m-%d %H:%M")
        );
        self.send(client_id, "Reservation rescheduled", &body).await
    }

    async fn notify_reminder(&self, client_id: &str, start: NaiveDateTime) -> anyhow::Result<()> {
        let body = format!(
            "A reminder for your appointment tomorrow at {}. See you there!",
            start.format("%H:%M")
        );
        self.send(client_id, "Appointment reminder", &body).await
    }
}
