//! Application settings file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use smsrelay_core::BREVO_API_URL;

const APP_DIR: &str = "smsrelay";

/// Default tracing filter when neither `RUST_LOG` nor the settings set one.
pub const DEFAULT_LOG_FILTER: &str = "smsrelay=info,smsrelay_core=info";

/// Settings that persist across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Transactional email endpoint.
    pub endpoint: String,
    /// `SQLite` database holding configuration and history.
    pub database_path: Option<PathBuf>,
    /// Tracing filter directive.
    pub log_filter: Option<String>,
    /// Per-request timeout for deliveries.
    pub request_timeout_secs: u64,
    /// Show alerts as desktop notifications.
    pub desktop_notifications: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            endpoint: BREVO_API_URL.to_string(),
            database_path: None,
            log_filter: None,
            request_timeout_secs: 30,
            desktop_notifications: true,
        }
    }
}

impl AppSettings {
    /// The configured database path, or the one under the data directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(default_database_path)
    }

    /// The tracing filter to use when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// `<config dir>/smsrelay/settings.json`.
#[must_use]
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("settings.json")
}

/// `<data dir>/smsrelay/smsrelay.db`.
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("smsrelay.db")
}

/// Load settings from `path`. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_settings(path: &Path) -> anyhow::Result<AppSettings> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Save settings to `path`, creating its directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!("Settings saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("smsrelay-settings-{}-{name}", std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.endpoint, BREVO_API_URL);
        assert_eq!(settings.request_timeout_secs, 30);
        assert!(settings.desktop_notifications);
        assert_eq!(settings.log_filter(), DEFAULT_LOG_FILTER);
        assert!(settings.database_path().ends_with("smsrelay/smsrelay.db"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"request_timeout_secs": 5}"#).unwrap();
        assert_eq!(settings.request_timeout_secs, 5);
        assert_eq!(settings.endpoint, BREVO_API_URL);
    }

    #[tokio::test]
    async fn missing_file_is_default() {
        let settings = load_settings(&scratch_path("missing")).await.unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let path = scratch_path("roundtrip");
        let settings = AppSettings {
            log_filter: Some("smsrelay=debug".into()),
            desktop_notifications: false,
            ..AppSettings::default()
        };

        save_settings(&path, &settings).await.unwrap();
        assert_eq!(load_settings(&path).await.unwrap(), settings);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let path = scratch_path("malformed");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, "{not json").await.unwrap();

        assert!(load_settings(&path).await.is_err());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
