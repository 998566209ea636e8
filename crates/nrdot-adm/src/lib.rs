#![warn(rust_2021_compatibility, unreachable_pub)]

//! Resource-pressure-driven state machine that mutates pipeline parameters (batch
//! size, scrape interval, sampling, drop classes) across leveled modes, with a
//! cooldown gate on downgrades.

mod assess;
mod effects;
mod manager;
mod metrics;
mod monitor;

pub use effects::DegradationEffects;
pub use manager::AdaptiveDegradationManager;
pub use metrics::MetricsSnapshot;
pub use monitor::{run as run_monitor, PipelineStateSource};
