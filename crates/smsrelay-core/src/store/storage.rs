//! Typed access to the persisted records.

use std::sync::Arc;

use tracing::warn;

use super::{KeyValueStore, StoreKey};
use crate::Result;
use crate::config::ForwardingConfig;
use crate::message::MessageRecord;
use crate::theme::ThemeMode;

/// Typed facade over a [`KeyValueStore`].
///
/// Values are encoded the same way the mobile app writes them: JSON for the
/// configuration and message history, plain strings for the flag and theme.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Wraps a store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Saves the forwarding configuration, replacing the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store write fails.
    pub async fn save_config(&self, config: &ForwardingConfig) -> Result<()> {
        let json = serde_json::to_string(config)?;
        self.store.set(StoreKey::Config, json).await
    }

    /// Loads the forwarding configuration, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or the record is not valid JSON.
    pub async fn get_config(&self) -> Result<Option<ForwardingConfig>> {
        match self.store.get(StoreKey::Config).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Saves the service flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn set_service_enabled(&self, enabled: bool) -> Result<()> {
        self.store
            .set(StoreKey::ServiceEnabled, enabled.to_string())
            .await
    }

    /// Loads the service flag. Anything other than `"true"` reads as disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_service_enabled(&self) -> Result<bool> {
        let value = self.store.get(StoreKey::ServiceEnabled).await?;
        Ok(value.as_deref() == Some("true"))
    }

    /// Saves the message history (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store write fails.
    pub async fn save_messages(&self, messages: &[MessageRecord]) -> Result<()> {
        let json = serde_json::to_string(messages)?;
        self.store.set(StoreKey::Messages, json).await
    }

    /// Loads the message history, or an empty list if none was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or the record is not valid JSON.
    pub async fn get_messages(&self) -> Result<Vec<MessageRecord>> {
        match self.store.get(StoreKey::Messages).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Saves the theme preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn save_theme(&self, mode: ThemeMode) -> Result<()> {
        self.store
            .set(StoreKey::Theme, mode.as_str().to_string())
            .await
    }

    /// Loads the theme preference, if one was saved and is recognised.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_theme(&self) -> Result<Option<ThemeMode>> {
        let Some(value) = self.store.get(StoreKey::Theme).await? else {
            return Ok(None);
        };
        match value.parse() {
            Ok(mode) => Ok(Some(mode)),
            Err(e) => {
                warn!("Ignoring stored theme: {e}");
                Ok(None)
            }
        }
    }
}
