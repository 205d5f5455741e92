//! The forwarding pipeline.
//!
//! A [`Pipeline`] owns the message history and the service settings. It
//! turns each inbound event into a persisted [`MessageRecord`], hands the
//! record to the [`DeliveryClient`] in the background, and marks it
//! delivered once the provider accepts it.
//!
//! Ingestion never waits for delivery. Each background delivery raises one
//! alert for its outcome and then reconciles the history.

mod builder;
mod error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, Notify, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use builder::PipelineBuilder;
pub use error::PipelineError;

use crate::clock::Clock;
use crate::config::{ForwardingConfig, validate_config};
use crate::delivery::{DeliveryClient, DeliveryOutcome};
use crate::message::{IdGenerator, MessageId, MessageLog, MessageRecord, RECEIVED_AT_FORMAT};
use crate::native::NativeSync;
use crate::notify::{Alert, Notifier};
use crate::source::{EventSource, InboundEvent};
use crate::store::Storage;
use crate::theme::ThemeMode;

/// Sender shown on test deliveries.
pub const TEST_SENDER: &str = "TEST";

/// Body of test deliveries.
pub const TEST_BODY: &str = "This is a test email from SMS Gateway app";

/// Handle to a background delivery.
#[derive(Debug)]
pub struct DeliveryHandle(JoinHandle<bool>);

impl DeliveryHandle {
    /// Waits for the delivery and returns whether the provider accepted it.
    ///
    /// Dropping the handle does not cancel the delivery.
    pub async fn wait(self) -> bool {
        match self.0.await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Delivery task failed: {e}");
                false
            }
        }
    }
}

/// Result of ingesting an event while the service is enabled.
#[derive(Debug)]
pub struct Ingested {
    /// Id assigned to the new record.
    pub id: MessageId,
    /// The background delivery of that record.
    pub delivery: DeliveryHandle,
}

struct Shared {
    storage: Storage,
    client: DeliveryClient,
    notifier: Arc<dyn Notifier>,
    native_sync: Arc<dyn NativeSync>,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    log: Mutex<MessageLog>,
    explicit: RwLock<ForwardingConfig>,
    enabled: AtomicBool,
    configured: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Counts a delivery as in flight until dropped.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn enter(shared: &Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(shared))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

struct Listener {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Listener {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!("Listener task failed: {e}");
        }
    }
}

/// Ingests inbound messages and forwards them by email.
///
/// Built with [`PipelineBuilder`]. Actions that change settings raise an
/// alert and persist before updating the in-memory state.
pub struct Pipeline {
    shared: Arc<Shared>,
    listener: Mutex<Option<Listener>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("enabled", &self.is_enabled())
            .field("configured", &self.is_configured())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Returns a builder over `store`.
    #[must_use]
    pub fn builder(store: Arc<dyn crate::store::KeyValueStore>) -> PipelineBuilder {
        PipelineBuilder::new(store)
    }

    /// Records `event` and starts delivering it.
    ///
    /// Returns `None` without touching the history when the service is
    /// disabled. The record is persisted as pending before delivery starts.
    pub async fn ingest(&self, event: InboundEvent) -> Option<Ingested> {
        self.shared.ingest(event).await
    }

    /// Applies a delivery outcome to the history.
    ///
    /// Only a successful outcome changes anything; unknown or evicted ids
    /// are ignored. Applying the same outcome twice is harmless.
    pub async fn reconcile(&self, id: MessageId, delivered: bool) {
        self.shared.reconcile(id, delivered).await;
    }

    /// Sends a fixed test message through the normal delivery path.
    ///
    /// A progress alert is raised before the attempt. The test message is
    /// not added to the history.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] before a configuration has
    /// been saved, otherwise the delivery failure.
    pub async fn send_test(&self) -> Result<(), PipelineError> {
        if !self.is_configured() {
            self.alert(Alert::error("Error", "Please save configuration first"));
            return Err(PipelineError::NotConfigured);
        }

        let shared = &self.shared;
        let record = MessageRecord::new(
            shared.ids.next(shared.clock.as_ref()),
            Some(TEST_SENDER),
            Some(TEST_BODY),
            shared.received_at(),
        );
        info!("Sending test message {}", record.id);
        self.alert(Alert::info("Sending Test Email", "Please wait..."));

        let _in_flight = InFlight::enter(shared);
        shared.deliver(&record).await?;

        self.alert(Alert::info("Test Email Sent", "Check your inbox!"));
        Ok(())
    }

    /// Validates and saves `config`, then marks the pipeline configured.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] listing every failed field,
    /// or [`PipelineError::Store`] if the configuration could not be saved.
    /// In-memory state is unchanged on error.
    pub async fn save_config(&self, config: ForwardingConfig) -> Result<(), PipelineError> {
        if let Err(errors) = validate_config(&config) {
            self.alert(Alert::error("Error", "Please fill all fields correctly"));
            return Err(PipelineError::InvalidConfig(errors));
        }

        if let Err(e) = self.shared.storage.save_config(&config).await {
            warn!("Failed to save configuration: {e}");
            self.alert(Alert::error("Error", "Failed to save configuration"));
            return Err(e.into());
        }

        self.shared
            .native_sync
            .sync_config(&config, self.is_enabled());
        *self.shared.explicit.write().await = config;
        self.shared.configured.store(true, Ordering::SeqCst);
        info!("Configuration saved");

        self.alert(Alert::info(
            "Success",
            "Configuration saved! Now enable the service toggle.",
        ));
        Ok(())
    }

    /// Turns forwarding on or off.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotConfigured`] when enabling before a
    /// configuration has been saved, or [`PipelineError::Store`] if the flag
    /// could not be saved.
    pub async fn set_service_enabled(&self, enabled: bool) -> Result<(), PipelineError> {
        if enabled && !self.is_configured() {
            self.alert(Alert::error("Error", "Please configure SMTP settings first!"));
            return Err(PipelineError::NotConfigured);
        }

        if let Err(e) = self.shared.storage.set_service_enabled(enabled).await {
            warn!("Failed to save service flag: {e}");
            return Err(e.into());
        }
        self.shared.enabled.store(enabled, Ordering::SeqCst);

        let config = self.shared.explicit.read().await.clone();
        self.shared.native_sync.sync_config(&config, enabled);

        if enabled {
            info!("Forwarding enabled");
            self.alert(Alert::info("Service Started", "SMS forwarding is now active"));
        } else {
            info!("Forwarding disabled");
            self.alert(Alert::info(
                "Service Stopped",
                "SMS forwarding has been stopped",
            ));
        }
        Ok(())
    }

    /// Flips the service flag. Returns the new state.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::set_service_enabled`].
    pub async fn toggle_service(&self) -> Result<bool, PipelineError> {
        let enabled = !self.is_enabled();
        self.set_service_enabled(enabled).await?;
        Ok(enabled)
    }

    /// The saved theme, or the default when none is saved or it is unreadable.
    pub async fn theme(&self) -> ThemeMode {
        match self.shared.storage.get_theme().await {
            Ok(mode) => mode.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load theme: {e}");
                ThemeMode::default()
            }
        }
    }

    /// Saves the theme preference.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if it could not be saved.
    pub async fn set_theme(&self, mode: ThemeMode) -> Result<(), PipelineError> {
        if let Err(e) = self.shared.storage.save_theme(mode).await {
            warn!("Failed to save theme: {e}");
            return Err(e.into());
        }
        debug!("Theme set to {mode}");
        Ok(())
    }

    /// The history, newest first.
    pub async fn messages(&self) -> Vec<MessageRecord> {
        self.shared.log.lock().await.records().to_vec()
    }

    /// The configuration set through [`Pipeline::save_config`] or loaded at
    /// startup.
    pub async fn config(&self) -> ForwardingConfig {
        self.shared.explicit.read().await.clone()
    }

    /// Whether forwarding is on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Whether a configuration has been saved.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.shared.configured.load(Ordering::SeqCst)
    }

    /// Number of deliveries, test sends included, still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Waits until no delivery is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Subscribes to `source` and ingests its events until [`Pipeline::close`].
    ///
    /// A previous subscription is released first, so at most one is active.
    pub async fn attach(&self, source: &dyn EventSource) {
        let mut listener = self.listener.lock().await;
        if let Some(previous) = listener.take() {
            previous.shutdown().await;
            debug!("Replaced previous event subscription");
        }

        let mut subscription = source.subscribe();
        let shared = Arc::clone(&self.shared);
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    event = subscription.recv() => match event {
                        Some(event) => {
                            shared.ingest(event).await;
                        }
                        None => {
                            debug!("Event source closed");
                            break;
                        }
                    },
                    _ = &mut stopped => break,
                }
            }
            subscription.close();
        });

        *listener = Some(Listener { stop, task });
        info!("Listening for inbound messages");
    }

    /// Releases the event subscription. Events the source emitted before
    /// this call are still ingested. Deliveries already started keep
    /// running; use [`Pipeline::wait_idle`] to wait for them.
    ///
    /// Calling this more than once is harmless.
    pub async fn close(&self) {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.shutdown().await;
            info!("Stopped listening for inbound messages");
        }
    }

    fn alert(&self, alert: Alert) {
        self.shared.notifier.alert(alert);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.task.abort();
        }
    }
}

impl Shared {
    async fn ingest(self: &Arc<Self>, event: InboundEvent) -> Option<Ingested> {
        if !self.enabled.load(Ordering::SeqCst) {
            debug!("Forwarding disabled, ignoring inbound message");
            return None;
        }

        let record = MessageRecord::new(
            self.ids.next(self.clock.as_ref()),
            event.originating_address.as_deref(),
            event.message_body.as_deref(),
            self.received_at(),
        );
        let id = record.id;
        info!("Received message {id} from {}", record.sender);

        {
            let mut log = self.log.lock().await;
            for evicted in log.push(record.clone()) {
                debug!("Evicted message {} from history", evicted.id);
            }
            self.persist(&log).await;
        }

        let in_flight = InFlight::enter(self);
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            let _in_flight = in_flight;
            let delivered = shared.deliver(&record).await.is_ok();
            shared.reconcile(record.id, delivered).await;
            delivered
        });

        Some(Ingested {
            id,
            delivery: DeliveryHandle(task),
        })
    }

    async fn deliver(&self, record: &MessageRecord) -> DeliveryOutcome {
        let explicit = self.explicit.read().await.clone();
        self.client.send(record, &explicit, &self.storage).await
    }

    async fn reconcile(&self, id: MessageId, delivered: bool) {
        if !delivered {
            debug!("Message {id} stays pending");
            return;
        }

        let mut log = self.log.lock().await;
        match log.mark_delivered(id) {
            Some(_) => self.persist(&log).await,
            None => debug!("Message {id} is no longer in history"),
        }
    }

    async fn persist(&self, log: &MessageLog) {
        if let Err(e) = self.storage.save_messages(log.records()).await {
            warn!("Failed to persist message history: {e}");
        }
    }

    fn received_at(&self) -> String {
        self.clock.now().format(RECEIVED_AT_FORMAT).to_string()
    }
}
