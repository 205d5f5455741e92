//! Forwarding configuration.
//!
//! Provides the configuration record, its validation, and the per-field
//! fallback used at send time.

mod model;
mod resolver;
mod validation;

pub use model::{ForwardingConfig, ResolvedConfig};
pub use resolver::resolve;
pub use validation::{ValidationError, ValidationResult, validate_config};
