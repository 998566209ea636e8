#![warn(rust_2021_compatibility, unreachable_pub)]

//! The control plane binding CardinalityLimiter, the AdaptivePriorityQueue,
//! EnhancedDLQ and the AdaptiveDegradationManager into a single pipeline stage:
//! ingest → cardinality admission → priority enqueue → drain to exporter / spill to
//! DLQ → later replay interleaved with live traffic, with ADM modulating behavior
//! under stress.

mod exporter;
mod pipeline;
mod resource;
mod stats;

pub use exporter::{ExportOutcome, Exporter};
pub use pipeline::{ConsumeOutcome, Pipeline};
pub use resource::{NullResourceSampler, ResourceSample, ResourceSampler};
pub use stats::{PipelineStateFeed, PipelineStats};
