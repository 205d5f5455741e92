//! Email delivery.
//!
//! This module turns a message record into one transactional-email request
//! and classifies the result.

mod client;
mod error;
mod payload;

pub use client::{BREVO_API_URL, DeliveryClient, DeliveryOutcome};
pub use error::{AUTH_HINT, DeliveryError};
pub use payload::{EMAIL_TEMPLATE, EmailPayload, Mailbox, render_template};
