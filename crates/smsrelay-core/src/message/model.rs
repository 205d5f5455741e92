//! Message record types.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// Sender recorded when the inbound event carries no originator.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Format used for [`MessageRecord::received_at`].
pub const RECEIVED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Unique, increasing identifier of a message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery state of a message record.
///
/// A record starts `Pending` and moves to `Delivered` once; it never moves
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryState {
    /// Not (yet) forwarded.
    #[default]
    Pending,
    /// Accepted by the email provider.
    Delivered,
}

impl DeliveryState {
    /// Returns true for `Delivered`.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Short label for listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "emailed",
        }
    }
}

/// A received text message and its forwarding state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Identifier assigned at ingestion.
    pub id: MessageId,
    /// Originating address, or [`UNKNOWN_SENDER`].
    pub sender: String,
    /// Message text; may be empty.
    #[serde(default)]
    pub body: String,
    /// Local time the message was received.
    #[serde(rename = "time", default)]
    pub received_at: String,
    /// Whether the message has been forwarded.
    #[serde(rename = "forwarded", with = "delivery_state_serde", default)]
    pub delivery_state: DeliveryState,
}

impl MessageRecord {
    /// Creates a pending record.
    ///
    /// A missing or blank sender becomes [`UNKNOWN_SENDER`]; a missing body
    /// becomes the empty string.
    #[must_use]
    pub fn new(
        id: MessageId,
        sender: Option<&str>,
        body: Option<&str>,
        received_at: impl Into<String>,
    ) -> Self {
        let sender = sender
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN_SENDER);

        Self {
            id,
            sender: sender.to_string(),
            body: body.unwrap_or_default().to_string(),
            received_at: received_at.into(),
            delivery_state: DeliveryState::Pending,
        }
    }

    /// Returns true once the record has been forwarded.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.delivery_state.is_delivered()
    }

    /// Marks the record delivered. Returns true if the state changed.
    pub fn mark_delivered(&mut self) -> bool {
        let changed = !self.is_delivered();
        self.delivery_state = DeliveryState::Delivered;
        changed
    }
}

/// The persisted log stores the delivery state as a `forwarded` boolean.
mod delivery_state_serde {
    use super::DeliveryState;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)] // Required by serde with= signature
    pub fn serialize<S>(state: &DeliveryState, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(state.is_delivered())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DeliveryState, D::Error>
    where
        D: Deserializer<'de>,
    {
        let forwarded = Option::<bool>::deserialize(deserializer)?;
        Ok(if forwarded.unwrap_or(false) {
            DeliveryState::Delivered
        } else {
            DeliveryState::Pending
        })
    }
}

/// Issues strictly increasing message ids from a clock.
///
/// Ids are the wall-clock time in milliseconds; when the clock has not moved
/// past the last id (two messages in the same millisecond, or the clock was
/// set back) the previous id plus one is used instead.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    /// Creates a generator that will never issue an id at or below `last`.
    #[must_use]
    pub const fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    /// Returns the next id.
    pub fn next(&self, clock: &dyn Clock) -> MessageId {
        let now = clock.now_millis();
        let mut current = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(current.saturating_add(1));
            match self.last.compare_exchange(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return MessageId(candidate),
                Err(actual) => current = actual,
            }
        }
    }
}
