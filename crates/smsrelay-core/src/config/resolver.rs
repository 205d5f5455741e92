//! Send-time configuration resolution.

use tracing::{debug, warn};

use super::model::{ForwardingConfig, ResolvedConfig};
use crate::store::Storage;

/// Resolves the configuration for one send attempt.
///
/// Each explicit field is trimmed; a non-blank explicit value wins, otherwise
/// the field is taken from the persisted configuration. The persisted record
/// is read at most once, and only when some explicit field is blank. A failed
/// read is logged and treated as "nothing persisted".
pub async fn resolve(explicit: &ForwardingConfig, storage: &Storage) -> ResolvedConfig {
    let mut resolved = ResolvedConfig {
        target_email: explicit.target_email.trim().to_string(),
        sender_email: explicit.sender_email.trim().to_string(),
        api_key: explicit.api_key.trim().to_string(),
    };

    if !resolved.target_email.is_empty()
        && !resolved.sender_email.is_empty()
        && !resolved.api_key.is_empty()
    {
        return resolved;
    }

    let stored = match storage.get_config().await {
        Ok(stored) => stored,
        Err(e) => {
            warn!("Failed to read stored configuration: {e}");
            None
        }
    };

    if let Some(stored) = stored {
        debug!("Filling blank configuration fields from storage");
        fill(&mut resolved, stored);
    }

    resolved
}

/// Per-field fallback; the stored api key is trimmed, addresses are used as
/// stored.
fn fill(resolved: &mut ResolvedConfig, stored: ForwardingConfig) {
    if resolved.api_key.is_empty() {
        resolved.api_key = stored.api_key.trim().to_string();
    }
    if resolved.sender_email.is_empty() {
        resolved.sender_email = stored.sender_email;
    }
    if resolved.target_email.is_empty() {
        resolved.target_email = stored.target_email;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::store::{KeyValueStore, MemoryStore, StoreKey};

    /// Counts reads so tests can check the lazy fetch.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn get(&self, key: StoreKey) -> crate::Result<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set(&self, key: StoreKey, value: String) -> crate::Result<()> {
            self.inner.set(key, value).await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: StoreKey) -> crate::Result<Option<String>> {
            Err(crate::Error::Config("store offline".into()))
        }

        async fn set(&self, _key: StoreKey, _value: String) -> crate::Result<()> {
            Err(crate::Error::Config("store offline".into()))
        }
    }

    async fn storage_with(stored: Option<ForwardingConfig>) -> (Arc<CountingStore>, Storage) {
        let store = Arc::new(CountingStore::default());
        let storage = Storage::new(store.clone());
        if let Some(config) = stored {
            storage.save_config(&config).await.unwrap();
        }
        (store, storage)
    }

    #[tokio::test]
    async fn field_level_fallback() {
        let (_, storage) =
            storage_with(Some(ForwardingConfig::new("t2", "s2", "k2"))).await;
        let resolved = resolve(&ForwardingConfig::new("", "s", "k"), &storage).await;

        assert_eq!(resolved.target_email, "t2");
        assert_eq!(resolved.sender_email, "s");
        assert_eq!(resolved.api_key, "k");
    }

    #[tokio::test]
    async fn complete_explicit_skips_store() {
        let (store, storage) =
            storage_with(Some(ForwardingConfig::new("t2", "s2", "k2"))).await;
        let resolved = resolve(&ForwardingConfig::new("t", "s", "k"), &storage).await;

        assert_eq!(resolved.target_email, "t");
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_read_once_when_needed() {
        let (store, storage) =
            storage_with(Some(ForwardingConfig::new("t2", "s2", "k2"))).await;
        let resolved = resolve(&ForwardingConfig::default(), &storage).await;

        assert_eq!(resolved.target_email, "t2");
        assert_eq!(resolved.sender_email, "s2");
        assert_eq!(resolved.api_key, "k2");
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn explicit_values_are_trimmed() {
        let (_, storage) = storage_with(None).await;
        let resolved = resolve(
            &ForwardingConfig::new("  t@x  ", "\ts@x\n", " key "),
            &storage,
        )
        .await;

        assert_eq!(resolved.target_email, "t@x");
        assert_eq!(resolved.sender_email, "s@x");
        assert_eq!(resolved.api_key, "key");
    }

    #[tokio::test]
    async fn whitespace_explicit_falls_back() {
        let (_, storage) =
            storage_with(Some(ForwardingConfig::new("t2", "s2", "  k2  "))).await;
        let resolved = resolve(&ForwardingConfig::new("t", "s", "   "), &storage).await;

        assert_eq!(resolved.api_key, "k2");
    }

    #[tokio::test]
    async fn nothing_stored_leaves_blanks() {
        let (_, storage) = storage_with(None).await;
        let resolved = resolve(&ForwardingConfig::new("t", "", ""), &storage).await;

        assert_eq!(resolved.target_email, "t");
        assert!(resolved.sender_email.is_empty());
        assert!(resolved.api_key.is_empty());
    }

    #[tokio::test]
    async fn broken_store_is_treated_as_empty() {
        let storage = Storage::new(Arc::new(BrokenStore));
        let resolved = resolve(&ForwardingConfig::new("t", "s", ""), &storage).await;

        assert_eq!(resolved.target_email, "t");
        assert!(resolved.api_key.is_empty());
    }
}
