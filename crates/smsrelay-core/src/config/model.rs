//! Forwarding configuration types.

use serde::{Deserialize, Serialize};

/// Forwarding configuration as entered by the user.
///
/// The same shape is used for the persisted record and for the explicit
/// values a caller holds in memory, where any field may be blank. Field
/// names on the wire match the record written by the mobile app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Address that receives forwarded messages.
    #[serde(rename = "targetEmail")]
    pub target_email: String,
    /// Verified sender address on the email provider.
    #[serde(rename = "smtpEmail")]
    pub sender_email: String,
    /// Transactional email API key.
    #[serde(rename = "smtpPassword")]
    pub api_key: String,
}

impl ForwardingConfig {
    /// Create a configuration from its three fields.
    #[must_use]
    pub fn new(
        target_email: impl Into<String>,
        sender_email: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            target_email: target_email.into(),
            sender_email: sender_email.into(),
            api_key: api_key.into(),
        }
    }
}

/// Configuration after per-field fallback, ready for a send attempt.
///
/// Fields may still be blank when neither the explicit values nor the
/// persisted record supplied them; the delivery client rejects those.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Recipient address.
    pub target_email: String,
    /// Sender address.
    pub sender_email: String,
    /// API key sent in the `api-key` header.
    pub api_key: String,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("target_email", &self.target_email)
            .field("sender_email", &self.sender_email)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<set>" })
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_app_record() {
        let json = r#"{"targetEmail":"me@example.com","smtpEmail":"gw@example.com","smtpPassword":"xkeysib-1"}"#;
        let config: ForwardingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.target_email, "me@example.com");
        assert_eq!(config.sender_email, "gw@example.com");
        assert_eq!(config.api_key, "xkeysib-1");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let config: ForwardingConfig = serde_json::from_str(r#"{"targetEmail":"a@b"}"#).unwrap();
        assert_eq!(config.target_email, "a@b");
        assert!(config.sender_email.is_empty());
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn serializes_with_app_keys() {
        let config = ForwardingConfig::new("t@x", "s@x", "k");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["targetEmail"], "t@x");
        assert_eq!(value["smtpEmail"], "s@x");
        assert_eq!(value["smtpPassword"], "k");
    }

    #[test]
    fn resolved_debug_hides_api_key() {
        let resolved = ResolvedConfig {
            target_email: "t@x".into(),
            sender_email: "s@x".into(),
            api_key: "secret-key".into(),
        };
        let debug = format!("{resolved:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<set>"));
    }
}
