use std::{sync::Arc, time::Duration};

use nrdot_context::CancellationToken;
use nrdot_types::PipelineState;
use tracing::info;

use crate::manager::AdaptiveDegradationManager;

/// Supplies the ADM monitor loop with the current pipeline state each tick. Kept as
/// a trait rather than a concrete dependency so ADM doesn't need to know how memory,
/// queue depth, CPU, error rate and p99 latency are actually measured.
pub trait PipelineStateSource: Send + Sync {
    fn snapshot(&self) -> PipelineState;
}

/// Runs the ADM assessment loop every `check_interval_sec`, until cancelled. Bounded
/// to the ≤1s shutdown window since each iteration either sleeps or is already past
/// its I/O-free, in-memory `tick`.
pub async fn run(
    adm: Arc<AdaptiveDegradationManager>,
    source: Arc<dyn PipelineStateSource>,
    check_interval_sec: u64,
    cancel: CancellationToken,
) {
    info!("ADM monitor starting");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let state = source.snapshot();
        adm.tick(state);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(check_interval_sec)) => {}
        }
    }
    info!("ADM monitor stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use nrdot_config::AdmConfig;
    use nrdot_context::{CancellationToken, TestClock};

    use super::*;

    struct FixedSource(Mutex<PipelineState>);

    impl PipelineStateSource for FixedSource {
        fn snapshot(&self) -> PipelineState {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_ticks_until_cancelled() {
        let adm = Arc::new(AdaptiveDegradationManager::new(AdmConfig::default(), Arc::new(TestClock::new())));
        let source = Arc::new(FixedSource(Mutex::new(PipelineState {
            mem_util_pct: 95.0,
            queue_util_pct: 0.0,
            cpu_util_pct: 0.0,
            err_rate_pct: 0.0,
            p99_latency_ms: 0.0,
        })));
        let cancel = CancellationToken::new();

        let adm_clone = Arc::clone(&adm);
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move { run(adm_clone, source, 5, cancel_clone).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(adm.current_level_index(), 3);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
