use crate::domain::email_client::{EmailBody, EmailClient};
use crate::domain::sender::Sender;
use crate::domain::subscriber_email::SubscriberEmail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_SEND_INTERVAL_SECONDS: u64 = 45;
/// Longest pause a caller may request between two sends.
pub const MAX_SEND_INTERVAL_SECONDS: u64 = 3_600;

/// Suspends the dispatcher between two sends.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// Base pause between two consecutive sends, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendInterval(u64);

impl SendInterval {
    pub fn from_secs(seconds: u64) -> Self {
        Self(seconds)
    }

    /// Validates a caller-supplied interval.
    pub fn parse(seconds: u64) -> Result<Self, String> {
        if seconds > MAX_SEND_INTERVAL_SECONDS {
            return Err(format!(
                "interval_seconds must be at most {}, got {}",
                MAX_SEND_INTERVAL_SECONDS, seconds
            ));
        }
        Ok(Self(seconds))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Whole-second bounds of the jittered pause, `[ceil(0.8 * base), floor(1.2 * base)]`.
    pub fn jitter_bounds(&self) -> (u64, u64) {
        let base = u128::from(self.0);
        let lo = (4 * base + 4) / 5;
        let hi = 6 * base / 5;
        // lo <= base always fits; hi saturates for bases above u64::MAX / 1.2
        (lo as u64, u64::try_from(hi).unwrap_or(u64::MAX))
    }

    pub fn jittered<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let (lo, hi) = self.jitter_bounds();
        Duration::from_secs(rng.gen_range(lo..=hi))
    }
}

impl Default for SendInterval {
    fn default() -> Self {
        Self(DEFAULT_SEND_INTERVAL_SECONDS)
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub recipient: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub send_duration_secs: f64,
    pub timestamp: DateTime<Utc>,
}

impl DispatchResult {
    fn succeeded(recipient: &str, message_id: String, elapsed: Duration) -> Self {
        Self {
            recipient: recipient.to_string(),
            success: true,
            message_id: Some(message_id),
            error: None,
            send_duration_secs: elapsed.as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    fn failed(recipient: &str, error: String, elapsed: Duration) -> Self {
        Self {
            recipient: recipient.to_string(),
            success: false,
            message_id: None,
            error: Some(error),
            send_duration_secs: elapsed.as_secs_f64(),
            timestamp: Utc::now(),
        }
    }
}

/// The message every recipient of one dispatch receives.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    pub sender: &'a Sender,
    pub subject: &'a str,
    pub body: &'a EmailBody,
}

/// Sends one message to many recipients, one at a time, pausing between
/// sends. Holds no state between calls.
pub struct Dispatcher<'a> {
    email_client: &'a dyn EmailClient,
    delay: &'a dyn Delay,
}

impl<'a> Dispatcher<'a> {
    pub fn new(email_client: &'a dyn EmailClient, delay: &'a dyn Delay) -> Self {
        Self {
            email_client,
            delay,
        }
    }

    #[tracing::instrument(
        name = "Dispatching message to recipients",
        skip(self, recipients, message, rng),
        fields(
            recipients = recipients.len(),
            subject = %message.subject,
            interval_seconds = interval.as_secs()
        )
    )]
    pub async fn dispatch<R: Rng + Send>(
        &self,
        recipients: &[String],
        message: &Message<'_>,
        interval: SendInterval,
        rng: &mut R,
    ) -> Vec<DispatchResult> {
        let total = recipients.len();
        let mut results = Vec::with_capacity(total);

        for (index, recipient) in recipients.iter().enumerate() {
            tracing::info!("[{}/{}] Sending to {}", index + 1, total, recipient);

            let result = self.send_one(recipient, message).await;
            match &result.error {
                None => tracing::info!(
                    "[{}/{}] Sent to {} in {:.2}s",
                    index + 1,
                    total,
                    recipient,
                    result.send_duration_secs
                ),
                Some(error) => tracing::warn!(
                    error.message = %error,
                    "[{}/{}] Failed to send to {}",
                    index + 1,
                    total,
                    recipient
                ),
            }
            results.push(result);

            if index + 1 < total {
                let pause = interval.jittered(rng);
                tracing::info!("Waiting {}s before the next send", pause.as_secs());
                self.delay.wait(pause).await;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        tracing::info!(
            successful,
            failed = total - successful,
            "Dispatch finished: {}/{} delivered",
            successful,
            total
        );

        results
    }

    async fn send_one(&self, recipient: &str, message: &Message<'_>) -> DispatchResult {
        let started = Instant::now();

        let address = match SubscriberEmail::parse(recipient.to_string()) {
            Ok(address) => address,
            Err(e) => return DispatchResult::failed(recipient, e, started.elapsed()),
        };

        match self
            .email_client
            .send_email_to(message.sender, &address, message.subject, message.body)
            .await
        {
            Ok(message_id) => DispatchResult::succeeded(recipient, message_id, started.elapsed()),
            Err(e) => DispatchResult::failed(recipient, format!("{:#}", e), started.elapsed()),
        }
    }
}
