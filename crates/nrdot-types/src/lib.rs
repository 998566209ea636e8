#![warn(rust_2021_compatibility, unreachable_pub)]

//! Data model shared by every NRDOT+ component: the record shape flowing through the
//! pipeline, the key-set identity used for cardinality admission, the queue item and
//! DLQ record shapes, and the scalar pipeline state ADM observes.

mod action;
mod attributes;
mod class;
mod dlq_record;
mod keyset;
mod kind;
mod pipeline_state;
mod queue_item;
mod record;

pub use action::Action;
pub use attributes::{AttributeMap, AttributeValue};
pub use class::Class;
pub use dlq_record::DlqRecord;
pub use keyset::{AttributeKeySet, KeySetEntry};
pub use kind::Kind;
pub use pipeline_state::PipelineState;
pub use queue_item::QueueItem;
pub use record::Record;

/// Records at the DLQ boundary may not exceed this size.
pub const MAX_RECORD_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;
