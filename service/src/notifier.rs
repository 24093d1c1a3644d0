use std::{sync::Arc, time::Duration};

use abi::{NotifierConfig, Reservation};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

/// Where conflict alerts are published.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), abi::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub subject: String,
    pub message: String,
}

/// Publishes alerts as JSON `{"subject", "message"}` to a webhook topic.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    topic: String,
}

impl WebhookChannel {
    pub fn new(topic: impl Into<String>, timeout: Duration) -> Result<Self, abi::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| abi::Error::Notification(e.to_string()))?;
        Ok(Self {
            client,
            topic: topic.into(),
        })
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), abi::Error> {
        let alert = Alert {
            subject: subject.to_string(),
            message: message.to_string(),
        };
        self.client
            .post(&self.topic)
            .json(&alert)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request to {} timed out", self.topic)
                } else {
                    e.to_string()
                };
                abi::Error::Notification(reason)
            })?;
        Ok(())
    }
}

/// Sends conflict alerts. Without a channel every alert fails with `NotifierNotConfigured`.
#[derive(Clone, Default)]
pub struct Notifier {
    channel: Option<Arc<dyn AlertChannel>>,
}

impl Notifier {
    pub fn new(channel: Option<Arc<dyn AlertChannel>>) -> Self {
        Self { channel }
    }

    pub fn from_config(config: &NotifierConfig) -> Result<Self, abi::Error> {
        let channel = match &config.topic {
            Some(topic) if !topic.trim().is_empty() => {
                let channel = WebhookChannel::new(topic, Duration::from_secs(config.timeout_secs))?;
                Some(Arc::new(channel) as Arc<dyn AlertChannel>)
            }
            _ => None,
        };
        Ok(Self::new(channel))
    }

    pub fn is_configured(&self) -> bool {
        self.channel.is_some()
    }

    pub async fn notify_conflict(
        &self,
        rsvp: &Reservation,
        conflicts: &[Reservation],
    ) -> Result<(), abi::Error> {
        let channel = self
            .channel
            .as_ref()
            .ok_or(abi::Error::NotifierNotConfigured)?;
        let alert = conflict_alert(rsvp, conflicts);
        channel.publish(&alert.subject, &alert.message).await?;
        info!(reservation_id = %rsvp.id, conflicts = conflicts.len(), "conflict alert sent");
        Ok(())
    }
}

pub fn conflict_alert(rsvp: &Reservation, conflicts: &[Reservation]) -> Alert {
    let subject = format!(
        "Reservation conflict for room {}",
        or_na(&rsvp.room_number)
    );

    let mut message = String::from("A reservation conflict was detected.\n\nNew reservation:\n");
    message.push_str(&format!("- ID: {}\n", rsvp.id));
    message.push_str(&format!("- Room: {}\n", or_na(&rsvp.room_number)));
    message.push_str(&details(rsvp, ""));

    message.push_str("\nIt overlaps the following reservations:\n");
    for conflict in conflicts {
        message.push_str(&format!("\n* Reservation ID: {}\n", conflict.id));
        message.push_str(&details(conflict, "  "));
    }
    message.push_str("\nPlease contact the guests to resolve the conflict.\n");

    Alert { subject, message }
}

fn details(rsvp: &Reservation, indent: &str) -> String {
    format!(
        "{indent}- Guest: {}\n{indent}- Check-in: {}\n{indent}- Check-out: {}\n{indent}- Email: {}\n",
        or_na(&rsvp.guest_name),
        or_na(&rsvp.check_in),
        or_na(&rsvp.check_out),
        or_na(&rsvp.contact_email),
    )
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("n/a")
}
