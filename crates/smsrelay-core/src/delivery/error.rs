//! Delivery failure kinds.

use std::sync::LazyLock;

use regex::Regex;

/// Hint attached to rejections that look like a credential problem.
pub const AUTH_HINT: &str = "Authentication error - check your Brevo API key in app settings.";

/// Why a single delivery attempt failed.
///
/// Every kind is terminal for the attempt; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// No API key after fallback.
    #[error("Brevo API key missing. Open app and save configuration.")]
    MissingCredential,

    /// No sender or target address after fallback.
    #[error("Sender or target email missing in configuration.")]
    MissingAddress,

    /// The endpoint could not be reached or the response could not be read.
    #[error("Failed to send: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("{message}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Diagnostic text from the provider.
        message: String,
        /// Remediation hint for credential errors.
        hint: Option<&'static str>,
    },
}

impl DeliveryError {
    /// Builds a rejection, attaching [`AUTH_HINT`] when the provider's text
    /// looks like an authentication failure.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let hint = mentions_credentials(&message).then_some(AUTH_HINT);
        Self::RemoteRejected {
            status,
            message,
            hint,
        }
    }

    /// Title of the alert raised for this failure.
    #[must_use]
    pub const fn alert_title(&self) -> &'static str {
        match self {
            Self::RemoteRejected { .. } => "Email Delivery Error",
            Self::MissingCredential | Self::MissingAddress | Self::Transport(_) => "Email Error",
        }
    }

    /// Body of the alert raised for this failure, including the hint line.
    #[must_use]
    pub fn alert_message(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{self}\n\nHint: {hint}"),
            None => self.to_string(),
        }
    }

    /// The hint, if any.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RemoteRejected { hint, .. } => *hint,
            _ => None,
        }
    }
}

/// Provider text that points at a credential problem.
static CREDENTIAL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)auth|authentication|api[-_ ]?key").ok());

fn mentions_credentials(text: &str) -> bool {
    CREDENTIAL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(text))
}
