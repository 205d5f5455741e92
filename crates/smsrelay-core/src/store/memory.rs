//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreKey};
use crate::Result;

/// Store that keeps values in a map for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: StoreKey, value: String) -> Result<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(StoreKey::Config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryStore::new();
        store.set(StoreKey::Theme, "dark".into()).await.unwrap();
        store.set(StoreKey::Theme, "light".into()).await.unwrap();
        assert_eq!(
            store.get(StoreKey::Theme).await.unwrap().as_deref(),
            Some("light")
        );
        assert!(store.get(StoreKey::Config).await.unwrap().is_none());
    }
}
