#![warn(rust_2021_compatibility, unreachable_pub)]

//! Maintains a bounded hash table of unique attribute key-sets and decides
//! admit / aggregate / drop for each incoming record based on the historical entropy
//! of its attribute values.

mod entropy;
mod limiter;
mod metrics;

pub use entropy::EntropyTracker;
pub use limiter::{AdmitDecision, CardinalityLimiter};
pub use metrics::MetricsSnapshot;
