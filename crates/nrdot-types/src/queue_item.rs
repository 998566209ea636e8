use std::time::Instant;

use crate::{Class, Record};

/// An item admitted into the APQ. Lifetime: created at APQ admission, destroyed on
/// successful drain or on spill to the DLQ.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub payload: Record,
    pub class: Class,
    pub enqueued_at: Instant,
}

impl QueueItem {
    pub fn new(payload: Record) -> Self {
        let class = payload.class;
        Self {
            payload,
            class,
            enqueued_at: Instant::now(),
        }
    }
}
