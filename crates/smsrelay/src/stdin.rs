//! Inbound events read as JSON lines.
//!
//! Each line is one event in the platform's shape:
//! `{"originatingAddress": "+15551234567", "messageBody": "hello"}`.

use smsrelay_core::{ChannelSource, InboundEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Reads events from `reader` until EOF and emits each into `source`.
///
/// Blank lines are skipped and malformed lines are logged and skipped.
/// Returns the number of events emitted.
///
/// # Errors
///
/// Returns an error if reading fails.
pub async fn feed_lines<R>(reader: R, source: &ChannelSource) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut emitted = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => {
                let listeners = source.emit(&event);
                debug!("Emitted inbound event to {listeners} listener(s)");
                emitted += 1;
            }
            Err(e) => warn!("Skipping malformed event line: {e}"),
        }
    }

    Ok(emitted)
}
