//! Key-value persistence.
//!
//! The pipeline persists four records through an async [`KeyValueStore`]:
//! the forwarding configuration, the service flag, the message history and
//! the theme preference. [`Storage`] wraps a store with typed accessors.

mod memory;
mod sqlite;
mod storage;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use storage::Storage;

use crate::Result;

/// Logical records held in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Forwarding configuration (JSON object).
    Config,
    /// Whether forwarding is enabled (`"true"` / `"false"`).
    ServiceEnabled,
    /// Message history (JSON array, newest first).
    Messages,
    /// Theme preference (`"system"`, `"light"` or `"dark"`).
    Theme,
}

impl StoreKey {
    /// All keys.
    pub const ALL: [Self; 4] = [Self::Config, Self::ServiceEnabled, Self::Messages, Self::Theme];

    /// Key name in the backing store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "sms_config",
            Self::ServiceEnabled => "service_enabled",
            Self::Messages => "messages",
            Self::Theme => "theme_mode",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value, returning `None` if the key was never written.
    async fn get(&self, key: StoreKey) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: StoreKey, value: String) -> Result<()>;
}
