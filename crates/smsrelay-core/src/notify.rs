//! User-facing alerts.
//!
//! Every delivery outcome and every settings change produces exactly one
//! [`Alert`]. How it reaches the user is up to the [`Notifier`].

use tracing::{info, warn};

/// How an alert should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    /// Confirmation of something that worked.
    Info,
    /// Something failed.
    Error,
}

/// A titled, human-readable notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Presentation level.
    pub level: AlertLevel,
    /// Short title.
    pub title: String,
    /// Message body.
    pub message: String,
}

impl Alert {
    /// Creates an informational alert.
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Creates an error alert.
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: AlertLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Returns true for error alerts.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == AlertLevel::Error
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Receives alerts for the user.
pub trait Notifier: Send + Sync {
    /// Presents an alert. Must not block for long.
    fn alert(&self, alert: Alert);
}

/// Notifier that writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, alert: Alert) {
        match alert.level {
            AlertLevel::Info => info!(title = %alert.title, "{}", alert.message),
            AlertLevel::Error => warn!(title = %alert.title, "{}", alert.message),
        }
    }
}
