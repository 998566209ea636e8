use async_trait::async_trait;
use nrdot_types::Record;

/// Outcome of a downstream export attempt. Drain workers fold this into the APQ's
/// circuit breaker accounting and, on `TransientErr`, the DLQ write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Ok,
    TransientErr,
    PermanentErr,
}

/// The out-of-scope upstream exporter's contract, as seen from inside the core
/// pipeline. Receivers, the concrete OTLP/Prometheus exporters, health endpoints and
/// packaging live outside this crate; this trait is the only seam they need to
/// implement against.
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn send(&self, batch: Vec<Record>) -> ExportOutcome;
}
