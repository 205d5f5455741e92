//! Message records and the bounded history.

mod log;
mod model;

pub use log::{MAX_MESSAGES, MessageLog};
pub use model::{
    DeliveryState, IdGenerator, MessageId, MessageRecord, RECEIVED_AT_FORMAT, UNKNOWN_SENDER,
};
