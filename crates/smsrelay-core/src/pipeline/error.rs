//! Pipeline errors.

use crate::config::ValidationError;
use crate::delivery::DeliveryError;

/// Errors returned by pipeline actions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The action needs a saved configuration first.
    #[error("Forwarding is not configured")]
    NotConfigured,

    /// The configuration was rejected before saving.
    #[error("Invalid configuration: {}", join_messages(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// The delivery attempt failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// The store could not be written.
    #[error("Storage error: {0}")]
    Store(#[from] crate::Error),
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::message)
        .collect::<Vec<_>>()
        .join(", ")
}
