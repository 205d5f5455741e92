//! Transactional email request body.

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::message::MessageRecord;

/// Display name of the sending mailbox.
pub const SENDER_NAME: &str = "SMS Gateway";

/// Display name of the recipient.
pub const RECIPIENT_NAME: &str = "You";

/// HTML body. `{{sender}}`, `{{time}}` and `{{body}}` are substituted.
pub const EMAIL_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; padding: 20px; background: #f5f5f5;">
  <div style="background: white; border-radius: 8px; padding: 20px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
    <h3 style="color: #007AFF; margin-top: 0;">📱 New SMS Received</h3>
    <p><strong>From:</strong> {{sender}}</p>
    <p><strong>Time:</strong> {{time}}</p>
    <hr style="border: none; border-top: 1px solid #eee; margin: 20px 0;">
    <p style="color: #333; font-size: 16px; line-height: 1.5;">{{body}}</p>
  </div>
</div>"#;

/// Named mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mailbox {
    /// Address.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// Body of `POST /v3/smtp/email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    /// From mailbox.
    pub sender: Mailbox,
    /// Recipients.
    pub to: Vec<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// Rendered HTML body.
    pub html_content: String,
    /// Plain-text body.
    pub text_content: String,
}

impl EmailPayload {
    /// Builds the email forwarding `message` with `config`'s addresses.
    #[must_use]
    pub fn for_message(message: &MessageRecord, config: &ResolvedConfig) -> Self {
        Self {
            sender: Mailbox {
                email: config.sender_email.clone(),
                name: SENDER_NAME.to_string(),
            },
            to: vec![Mailbox {
                email: config.target_email.clone(),
                name: RECIPIENT_NAME.to_string(),
            }],
            subject: format!("📱 SMS from {}", message.sender),
            html_content: render_template(
                EMAIL_TEMPLATE,
                &[
                    ("sender", message.sender.as_str()),
                    ("time", message.received_at.as_str()),
                    ("body", message.body.as_str()),
                ],
            ),
            text_content: format!(
                "From: {}\nTime: {}\n\nMessage:\n{}",
                message.sender, message.received_at, message.body
            ),
        }
    }
}

/// Substitutes `{{name}}` placeholders in one pass, HTML-escaping values.
///
/// Unknown placeholders are left as they are. Substituted text is never
/// rescanned, so a message body containing `{{time}}` stays literal.
#[must_use]
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(&escape_html(value)),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
