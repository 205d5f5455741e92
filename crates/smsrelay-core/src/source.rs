//! Inbound message events.
//!
//! An [`EventSource`] hands out [`Subscription`]s. A subscription receives
//! every event emitted while it is alive and is released when it is closed
//! or dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A received text message as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboundEvent {
    /// Sender's address, if the platform reported one.
    pub originating_address: Option<String>,
    /// Message text, if any.
    pub message_body: Option<String>,
}

impl InboundEvent {
    /// Creates an event with both fields set.
    #[must_use]
    pub fn new(originating_address: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            originating_address: Some(originating_address.into()),
            message_body: Some(message_body.into()),
        }
    }
}

/// Something that produces inbound events.
pub trait EventSource: Send + Sync {
    /// Starts receiving events.
    fn subscribe(&self) -> Subscription;
}

type Release = Box<dyn FnOnce() + Send>;

/// A live registration with an event source.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<InboundEvent>,
    release: Option<Release>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("open", &self.release.is_some())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Wraps a receiver; `release` runs once when the subscription ends.
    #[must_use]
    pub fn new(
        receiver: mpsc::UnboundedReceiver<InboundEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next event. Returns `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.receiver.recv().await
    }

    /// Unsubscribes. Dropping the subscription has the same effect.
    pub fn close(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            self.receiver.close();
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[derive(Debug, Default)]
struct Listeners {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<InboundEvent>>,
}

/// In-process event source that fans events out to every subscriber.
#[derive(Debug, Clone, Default)]
pub struct ChannelSource {
    listeners: Arc<Mutex<Listeners>>,
}

impl ChannelSource {
    /// Creates a source with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every live subscriber. Returns how many received it.
    pub fn emit(&self, event: &InboundEvent) -> usize {
        let Ok(mut listeners) = self.listeners.lock() else {
            warn!("Event source lock poisoned, dropping event");
            return 0;
        };
        listeners
            .senders
            .retain(|_, sender| sender.send(event.clone()).is_ok());
        listeners.senders.len()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.senders.len())
            .unwrap_or(0)
    }
}

impl EventSource for ChannelSource {
    fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();

        let id = match self.listeners.lock() {
            Ok(mut listeners) => {
                let id = listeners.next_id;
                listeners.next_id += 1;
                listeners.senders.insert(id, sender);
                id
            }
            Err(_) => {
                warn!("Event source lock poisoned, subscription will receive nothing");
                return Subscription::new(receiver, || {});
            }
        };
        debug!("Listener {id} subscribed");

        let listeners: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(receiver, move || {
            if let Some(listeners) = listeners.upgrade()
                && let Ok(mut listeners) = listeners.lock()
            {
                listeners.senders.remove(&id);
                debug!("Listener {id} unsubscribed");
            }
        })
    }
}
