//! HTTP client for the Brevo transactional email API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::DeliveryError;
use super::payload::EmailPayload;
use crate::config::{ForwardingConfig, ResolvedConfig, resolve};
use crate::message::MessageRecord;
use crate::notify::{Alert, LogNotifier, Notifier};
use crate::store::Storage;

/// Brevo endpoint for sending a transactional email.
pub const BREVO_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Result of one delivery attempt.
pub type DeliveryOutcome = Result<(), DeliveryError>;

/// Sends one email per message through the provider's HTTP API.
///
/// The client holds no per-message state: each call resolves its own
/// configuration, makes a single request and reports the outcome.
#[derive(Clone)]
pub struct DeliveryClient {
    http_client: Client,
    endpoint: String,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Default for DeliveryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryClient {
    /// Creates a client for [`BREVO_API_URL`] that logs its alerts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
            endpoint: BREVO_API_URL.to_string(),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> crate::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new().with_http_client(http_client))
    }

    /// Uses a preconfigured HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Sends to a different URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Reports outcomes to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Forwards `message`, filling blank fields of `explicit` from the
    /// persisted configuration in `fallback`.
    ///
    /// Exactly one alert is raised for the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`DeliveryError`] that ended the attempt.
    pub async fn send(
        &self,
        message: &MessageRecord,
        explicit: &ForwardingConfig,
        fallback: &Storage,
    ) -> DeliveryOutcome {
        let config = resolve(explicit, fallback).await;
        let outcome = self.send_resolved(message, &config).await;
        self.report(message, &outcome);
        outcome
    }

    /// Validates `config` and makes the request. Raises no alert.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::MissingCredential`] or
    /// [`DeliveryError::MissingAddress`] before any request is made, otherwise
    /// the transport or provider failure.
    pub async fn send_resolved(
        &self,
        message: &MessageRecord,
        config: &ResolvedConfig,
    ) -> DeliveryOutcome {
        if config.api_key.is_empty() {
            return Err(DeliveryError::MissingCredential);
        }
        if config.sender_email.is_empty() || config.target_email.is_empty() {
            return Err(DeliveryError::MissingAddress);
        }

        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| DeliveryError::Transport(format!("invalid API key header value: {e}")))?;
        let payload = EmailPayload::for_message(message, config);

        debug!("Sending message {} to {}", message.id, self.endpoint);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        debug!("Provider answered {status} for message {}", message.id);

        if status.is_success() {
            return Ok(());
        }

        Err(DeliveryError::rejected(
            status.as_u16(),
            rejection_message(status.as_u16(), &raw),
        ))
    }

    fn report(&self, message: &MessageRecord, outcome: &DeliveryOutcome) {
        match outcome {
            Ok(()) => {
                info!("Forwarded message {} from {}", message.id, message.sender);
                self.notifier.alert(Alert::info(
                    "Email Forwarded",
                    format!("SMS from {} was emailed.", message.sender),
                ));
            }
            Err(e) => {
                warn!("Delivery of message {} failed: {e}", message.id);
                self.notifier
                    .alert(Alert::error(e.alert_title(), e.alert_message()));
            }
        }
    }
}

/// Picks the provider's diagnostic: JSON `message`, then JSON `error`, then
/// the raw body when it is not JSON, then the bare status.
fn rejection_message(status: u16, raw: &str) -> String {
    let from_json = serde_json::from_str::<Value>(raw).map(|value| {
        ["message", "error"].iter().find_map(|field| match value.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
    });

    match from_json {
        Ok(Some(message)) => message,
        Ok(None) => format!("HTTP {status}"),
        Err(_) if !raw.trim().is_empty() => raw.trim().to_string(),
        Err(_) => format!("HTTP {status}"),
    }
}
