//! # smsrelay-core
//!
//! Core forwarding pipeline for the `smsrelay` SMS-to-email gateway.
//!
//! This crate provides:
//! - Inbound event sources and subscriptions
//! - A bounded, persisted message history
//! - Per-field configuration fallback
//! - Delivery through the Brevo transactional email API
//! - Key-value persistence (in memory or `SQLite`)
//! - User alerts and theme preference

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod delivery;
mod error;
pub mod message;
pub mod native;
pub mod notify;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod theme;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::{ForwardingConfig, ResolvedConfig, ValidationError, validate_config};
pub use delivery::{AUTH_HINT, BREVO_API_URL, DeliveryClient, DeliveryError, DeliveryOutcome};
pub use error::{Error, Result};
pub use message::{DeliveryState, MAX_MESSAGES, MessageId, MessageLog, MessageRecord};
pub use native::{NativeSync, NoopSync};
pub use notify::{Alert, AlertLevel, LogNotifier, Notifier};
pub use pipeline::{DeliveryHandle, Ingested, Pipeline, PipelineBuilder, PipelineError};
pub use source::{ChannelSource, EventSource, InboundEvent, Subscription};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, Storage, StoreKey};
pub use theme::ThemeMode;
