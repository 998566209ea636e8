use std::{
    collections::VecDeque,
    sync::Arc,
    time::Duration,
};

use nrdot_apq::AdaptivePriorityQueue;
use nrdot_types::PipelineState;
use parking_lot::Mutex;

use crate::resource::ResourceSampler;

const LATENCY_WINDOW: usize = 512;
const ERROR_WINDOW: usize = 512;

/// Rolling outcome/latency bookkeeping feeding `err_rate_pct` and `p99_latency_ms`
/// into the `PipelineState` ADM observes. Memory and CPU utilization come from the
/// injected `ResourceSampler`, since sampling the host is an external concern this
/// core pipeline only consumes through a seam.
pub struct PipelineStats {
    outcomes: Mutex<VecDeque<bool>>,
    latencies_ms: Mutex<VecDeque<f64>>,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::with_capacity(ERROR_WINDOW)),
            latencies_ms: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
        }
    }
}

impl PipelineStats {
    pub fn record_outcome(&self, success: bool) {
        let mut outcomes = self.outcomes.lock();
        if outcomes.len() == ERROR_WINDOW {
            outcomes.pop_front();
        }
        outcomes.push_back(success);
    }

    pub fn record_latency(&self, duration: Duration) {
        let mut latencies = self.latencies_ms.lock();
        if latencies.len() == LATENCY_WINDOW {
            latencies.pop_front();
        }
        latencies.push_back(duration.as_secs_f64() * 1000.0);
    }

    fn err_rate_pct(&self) -> f64 {
        let outcomes = self.outcomes.lock();
        if outcomes.is_empty() {
            return 0.0;
        }
        let failures = outcomes.iter().filter(|&&ok| !ok).count();
        failures as f64 / outcomes.len() as f64 * 100.0
    }

    fn p99_latency_ms(&self) -> f64 {
        let mut samples: Vec<f64> = self.latencies_ms.lock().iter().copied().collect();
        if samples.is_empty() {
            return 0.0;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let idx = ((samples.len() as f64) * 0.99).ceil() as usize;
        samples[idx.saturating_sub(1).min(samples.len() - 1)]
    }
}

/// Combines queue depth (known exactly, from the APQ), the rolling error/latency
/// stats, and an external resource sampler into the scalar `PipelineState` ADM
/// assesses every `check_interval_sec`.
pub struct PipelineStateFeed {
    apq: Arc<AdaptivePriorityQueue>,
    max_queue_size: usize,
    stats: Arc<PipelineStats>,
    resource_sampler: Arc<dyn ResourceSampler>,
}

impl PipelineStateFeed {
    pub fn new(
        apq: Arc<AdaptivePriorityQueue>,
        max_queue_size: usize,
        stats: Arc<PipelineStats>,
        resource_sampler: Arc<dyn ResourceSampler>,
    ) -> Self {
        Self {
            apq,
            max_queue_size,
            stats,
            resource_sampler,
        }
    }
}

impl nrdot_adm::PipelineStateSource for PipelineStateFeed {
    fn snapshot(&self) -> PipelineState {
        let sample = self.resource_sampler.sample();
        PipelineState {
            mem_util_pct: sample.mem_util_pct,
            queue_util_pct: self.apq.depth() as f64 / self.max_queue_size as f64 * 100.0,
            cpu_util_pct: sample.cpu_util_pct,
            err_rate_pct: self.stats.err_rate_pct(),
            p99_latency_ms: self.stats.p99_latency_ms(),
        }
    }
}
