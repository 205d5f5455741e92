//! Desktop notifications for pipeline alerts.

use notify_rust::Notification;
use smsrelay_core::{Alert, LogNotifier, Notifier};
use tracing::debug;

/// Shows each alert as a desktop notification and logs it.
///
/// Notifications are shown off the async runtime; when no notification
/// service is available the alert is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn alert(&self, alert: Alert) {
        let show = move || {
            let result = Notification::new()
                .appname("smsrelay")
                .summary(&alert.title)
                .body(&alert.message)
                .show();
            if let Err(e) = result {
                debug!("Desktop notification unavailable: {e}");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(show);
            }
            Err(_) => show(),
        }
    }
}

/// Logs the alert, then forwards it to the desktop when enabled.
#[derive(Debug, Clone, Copy)]
pub struct AppNotifier {
    desktop: bool,
}

impl AppNotifier {
    /// Creates a notifier; `desktop` controls notifications.
    #[must_use]
    pub const fn new(desktop: bool) -> Self {
        Self { desktop }
    }
}

impl Notifier for AppNotifier {
    fn alert(&self, alert: Alert) {
        if self.desktop {
            LogNotifier.alert(alert.clone());
            DesktopNotifier.alert(alert);
        } else {
            LogNotifier.alert(alert);
        }
    }
}
