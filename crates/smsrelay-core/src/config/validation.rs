//! Forwarding configuration validation.

use super::model::ForwardingConfig;

/// Validation error for a forwarding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Target address is missing an `@`.
    InvalidTargetEmail,
    /// Sender address is missing an `@`.
    InvalidSenderEmail,
    /// API key is empty.
    EmptyApiKey,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidTargetEmail => "Target email address is invalid",
            Self::InvalidSenderEmail => "Sender email address is invalid",
            Self::EmptyApiKey => "API key is required",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a forwarding configuration before it is saved.
///
/// Addresses only need to contain an `@`; anything stricter is left to the
/// email provider. All failing fields are reported.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_config(config: &ForwardingConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if !config.target_email.contains('@') {
        errors.push(ValidationError::InvalidTargetEmail);
    }
    if !config.sender_email.contains('@') {
        errors.push(ValidationError::InvalidSenderEmail);
    }
    if config.api_key.is_empty() {
        errors.push(ValidationError::EmptyApiKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
