#![warn(rust_2021_compatibility, unreachable_pub)]

//! Weighted round-robin multi-class queue with spill-on-pressure and a circuit
//! breaker that routes around in-memory buffering straight to the DLQ while the
//! downstream exporter is unhealthy.

mod circuit;
mod metrics;
mod queue;
mod scheduler;

pub use circuit::CircuitBreaker;
pub use metrics::MetricsSnapshot;
pub use queue::{AdaptivePriorityQueue, EnqueueOutcome};
