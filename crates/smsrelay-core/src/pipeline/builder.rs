//! Pipeline construction and startup.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{info, warn};

use super::{Pipeline, Shared};
use crate::clock::{Clock, SystemClock};
use crate::delivery::DeliveryClient;
use crate::message::{IdGenerator, MessageLog};
use crate::native::{NativeSync, NoopSync};
use crate::notify::{LogNotifier, Notifier};
use crate::store::{KeyValueStore, Storage};

/// Configures and starts a [`Pipeline`].
pub struct PipelineBuilder {
    storage: Storage,
    client: DeliveryClient,
    notifier: Arc<dyn Notifier>,
    native_sync: Arc<dyn NativeSync>,
    clock: Arc<dyn Clock>,
}

impl PipelineBuilder {
    /// Starts from defaults: the Brevo endpoint, alerts to the log, no
    /// native sync, and the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage: Storage::new(store),
            client: DeliveryClient::new(),
            notifier: Arc::new(LogNotifier),
            native_sync: Arc::new(NoopSync),
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `client` for deliveries. Its notifier is replaced by the
    /// pipeline's.
    #[must_use]
    pub fn client(mut self, client: DeliveryClient) -> Self {
        self.client = client;
        self
    }

    /// Sends alerts to `notifier`.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Mirrors settings changes to `native_sync`.
    #[must_use]
    pub fn native_sync(mut self, native_sync: Arc<dyn NativeSync>) -> Self {
        self.native_sync = native_sync;
        self
    }

    /// Takes ids and timestamps from `clock`.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Loads the persisted state and returns a running pipeline.
    ///
    /// Each record is loaded independently; one that cannot be read is
    /// logged and replaced by its default so startup never fails.
    pub async fn start(self) -> Pipeline {
        let stored_config = match self.storage.get_config().await {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load configuration: {e}");
                None
            }
        };

        let enabled = self.storage.get_service_enabled().await.unwrap_or_else(|e| {
            warn!("Failed to load service flag: {e}");
            false
        });

        let records = self.storage.get_messages().await.unwrap_or_else(|e| {
            warn!("Failed to load message history: {e}");
            Vec::new()
        });
        let log = MessageLog::from_records(records);
        let ids = IdGenerator::starting_after(log.max_id().map_or(0, |id| id.0));

        info!(
            "Pipeline started: configured={}, enabled={enabled}, {} message(s) in history",
            stored_config.is_some(),
            log.len()
        );

        let shared = Shared {
            storage: self.storage,
            client: self.client.with_notifier(self.notifier.clone()),
            notifier: self.notifier,
            native_sync: self.native_sync,
            clock: self.clock,
            ids,
            log: Mutex::new(log),
            configured: AtomicBool::new(stored_config.is_some()),
            explicit: RwLock::new(stored_config.unwrap_or_default()),
            enabled: AtomicBool::new(enabled),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        };

        Pipeline {
            shared: Arc::new(shared),
            listener: Mutex::new(None),
        }
    }
}
