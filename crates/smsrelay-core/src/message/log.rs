//! Bounded, newest-first message history.

use super::model::{MessageId, MessageRecord};

/// Number of messages kept in the history.
pub const MAX_MESSAGES: usize = 20;

/// Most-recent-N list of message records.
///
/// New records are always inserted at the head. Once the log holds
/// [`MAX_MESSAGES`] records, each insertion drops the oldest one from the tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    records: Vec<MessageRecord>,
}

impl MessageLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Builds a log from records already ordered newest-first, keeping only
    /// the first [`MAX_MESSAGES`].
    #[must_use]
    pub fn from_records(mut records: Vec<MessageRecord>) -> Self {
        records.truncate(MAX_MESSAGES);
        Self { records }
    }

    /// Inserts a record at the head, returning the evicted records (oldest
    /// last) if the bound was exceeded.
    pub fn push(&mut self, record: MessageRecord) -> Vec<MessageRecord> {
        self.records.insert(0, record);
        if self.records.len() > MAX_MESSAGES {
            self.records.split_off(MAX_MESSAGES)
        } else {
            Vec::new()
        }
    }

    /// Marks the record with `id` delivered.
    ///
    /// Returns `None` if no such record is in the log (it may have been
    /// evicted), otherwise whether the state changed.
    pub fn mark_delivered(&mut self, id: MessageId) -> Option<bool> {
        self.records
            .iter_mut()
            .find(|record| record.id == id)
            .map(MessageRecord::mark_delivered)
    }

    /// Records, newest first.
    #[must_use]
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    /// Largest id in the log.
    #[must_use]
    pub fn max_id(&self) -> Option<MessageId> {
        self.records.iter().map(|record| record.id).max()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the log holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use crate::message::DeliveryState;
    use proptest::prelude::*;

    fn record(id: i64) -> MessageRecord {
        MessageRecord::new(MessageId(id), Some("+1555"), Some("body"), "t")
    }

    #[test]
    fn push_inserts_at_head() {
        let mut log = MessageLog::new();
        log.push(record(1));
        log.push(record(2));
        let ids: Vec<_> = log.records().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn push_evicts_oldest() {
        let mut log = MessageLog::new();
        for id in 1..=20 {
            assert!(log.push(record(id)).is_empty());
        }
        let evicted = log.push(record(21));
        assert_eq!(evicted, vec![record(1)]);
        assert_eq!(log.len(), MAX_MESSAGES);
        assert_eq!(log.mark_delivered(MessageId(1)), None);
    }

    #[test]
    fn from_records_truncates() {
        let records = (0..30).rev().map(record).collect();
        let log = MessageLog::from_records(records);
        assert_eq!(log.len(), MAX_MESSAGES);
        assert_eq!(log.records()[0].id, MessageId(29));
    }

    #[test]
    fn mark_delivered_found() {
        let mut log = MessageLog::new();
        log.push(record(1));
        assert_eq!(log.mark_delivered(MessageId(1)), Some(true));
        assert_eq!(log.mark_delivered(MessageId(1)), Some(false));
        assert_eq!(log.records()[0].delivery_state, DeliveryState::Delivered);
    }

    #[test]
    fn mark_delivered_missing() {
        let mut log = MessageLog::new();
        log.push(record(1));
        assert_eq!(log.mark_delivered(MessageId(99)), None);
        assert!(!log.records()[0].is_delivered());
    }

    #[test]
    fn max_id() {
        let mut log = MessageLog::new();
        assert_eq!(log.max_id(), None);
        log.push(record(5));
        log.push(record(3));
        assert_eq!(log.max_id(), Some(MessageId(5)));
    }

    proptest! {
        #[test]
        fn length_is_bounded_and_newest_first(n in 0usize..60) {
            let mut log = MessageLog::new();
            for id in 0..n {
                log.push(record(id as i64));
            }
            prop_assert_eq!(log.len(), n.min(MAX_MESSAGES));
            let ids: Vec<i64> = log.records().iter().map(|r| r.id.0).collect();
            let expected: Vec<i64> = (0..n as i64).rev().take(MAX_MESSAGES).collect();
            prop_assert_eq!(ids, expected);
        }
    }
}
