use std::{sync::Arc, time::Duration};

use nrdot_adm::{run_monitor, AdaptiveDegradationManager};
use nrdot_apq::{AdaptivePriorityQueue, EnqueueOutcome};
use nrdot_cardinality::{AdmitDecision, CardinalityLimiter};
use nrdot_config::Config;
use nrdot_context::{CancellationToken, Clock, SystemClock};
use nrdot_dlq::Dlq;
use nrdot_types::{AttributeMap, AttributeValue, Class, Record};
use rand::Rng;
use tracing::{info, warn};

use crate::{
    exporter::{ExportOutcome, Exporter},
    resource::{NullResourceSampler, ResourceSampler},
    stats::{PipelineStateFeed, PipelineStats},
};

/// Records pulled per drain iteration before the ADM `batch_size_multiplier` is
/// applied. Not currently exposed through configuration since nothing in the
/// distilled surface names it; revisit if a deployment needs this tunable.
const BASE_DRAIN_BATCH_SIZE: usize = 32;

/// How often the active DLQ segment and any rotated-out segments past
/// `retention_hours` are swept, independent of the ADM check cadence.
const RETENTION_SWEEP_INTERVAL_SEC: u64 = 3600;

/// Outcome of [`Pipeline::consume`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// Buffered in the APQ for later drain.
    Enqueued(EnqueueOutcome),
    /// Never reached the queue: the cardinality table was full and the
    /// record's key-set scored too low to aggregate or evict for.
    DroppedByCardinality,
    /// Never reached the queue: an active ADM effect (`drop_debug` /
    /// `drop_metrics`) or sampling roll discarded it first.
    DroppedByAdm,
}

/// The control plane binding the four subsystems into a single pipeline stage:
/// ingest → cardinality admission → priority enqueue → drain to exporter / spill to
/// DLQ → later replay interleaved with live traffic, with ADM modulating behavior
/// under stress.
pub struct Pipeline {
    cardinality: CardinalityLimiter,
    apq: Arc<AdaptivePriorityQueue>,
    dlq: Arc<Dlq>,
    adm: Arc<AdaptiveDegradationManager>,
    exporter: Arc<dyn Exporter>,
    stats: Arc<PipelineStats>,
    resource_sampler: Arc<dyn ResourceSampler>,
    clock: Arc<dyn Clock>,
    drain_workers: usize,
    max_queue_size: usize,
    check_interval_sec: u64,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Builds a pipeline from a validated [`Config`], the real system clock, and the
    /// given exporter. Pass a non-default [`ResourceSampler`] to feed ADM real
    /// memory/CPU readings; without one, ADM only reacts to queue depth and
    /// error/latency pressure.
    pub fn new(config: &Config, exporter: Arc<dyn Exporter>) -> Result<Self, nrdot_dlq::Error> {
        Self::with_collaborators(config, exporter, Arc::new(SystemClock), Arc::new(NullResourceSampler))
    }

    pub fn with_collaborators(
        config: &Config,
        exporter: Arc<dyn Exporter>,
        clock: Arc<dyn Clock>,
        resource_sampler: Arc<dyn ResourceSampler>,
    ) -> Result<Self, nrdot_dlq::Error> {
        let dlq = Arc::new(Dlq::from_config(&config.dlq, Arc::clone(&clock))?);
        let apq = Arc::new(AdaptivePriorityQueue::new(&config.apq, Arc::clone(&dlq), Arc::clone(&clock)));
        let cardinality = CardinalityLimiter::from_config(&config.cardinality, Arc::clone(&clock));
        let adm = Arc::new(AdaptiveDegradationManager::new(config.adm.clone(), Arc::clone(&clock)));

        Ok(Self {
            cardinality,
            apq,
            dlq,
            adm,
            exporter,
            stats: Arc::new(PipelineStats::default()),
            resource_sampler,
            clock,
            drain_workers: num_drain_workers(),
            max_queue_size: config.apq.max_queue_size,
            check_interval_sec: config.adm.check_interval_sec,
            cancel: CancellationToken::new(),
        })
    }

    /// Admits `record`: applies the currently-active ADM drop/sampling effects, then
    /// cardinality admission, then APQ enqueue (which itself may spill to the DLQ or
    /// reject outright if the exporter circuit is open).
    pub fn consume(&self, mut record: Record) -> ConsumeOutcome {
        let effects = self.adm.effects();

        if record.debug && effects.drop_debug {
            self.adm.record_drop(record.kind);
            return ConsumeOutcome::DroppedByAdm;
        }
        if record.kind == nrdot_types::Kind::Metric && effects.drop_metrics {
            self.adm.record_drop(record.kind);
            return ConsumeOutcome::DroppedByAdm;
        }
        if record.class != Class::Critical && effects.sample_rate < 1.0 {
            if rand::thread_rng().gen::<f64>() >= effects.sample_rate {
                self.adm.record_drop(record.kind);
                return ConsumeOutcome::DroppedByAdm;
            }
        }

        match self.cardinality.admit(&record) {
            AdmitDecision::Drop => ConsumeOutcome::DroppedByCardinality,
            AdmitDecision::Keep(_) => ConsumeOutcome::Enqueued(self.apq.enqueue(record)),
            AdmitDecision::Aggregate(keyset) => {
                record.attributes = keyset_to_attributes(&keyset);
                ConsumeOutcome::Enqueued(self.apq.enqueue(record))
            }
        }
    }

    /// Spawns the ADM monitor, `drain_workers` drain loops and the hourly retention
    /// sweep, returning a handle that resolves once every spawned task has observed
    /// `shutdown`.
    pub fn run(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run_inner().await })
    }

    async fn run_inner(self: Arc<Self>) {
        info!(workers = self.drain_workers, "pipeline starting");

        let source = Arc::new(PipelineStateFeed::new(
            Arc::clone(&self.apq),
            self.max_queue_size,
            Arc::clone(&self.stats),
            Arc::clone(&self.resource_sampler),
        ));
        let mut handles = Vec::new();
        handles.push(tokio::spawn(run_monitor(
            Arc::clone(&self.adm),
            source,
            self.check_interval_sec,
            self.cancel.clone(),
        )));

        for worker_id in 0..self.drain_workers {
            let pipeline = Arc::clone(&self);
            handles.push(tokio::spawn(async move { pipeline.drain_loop(worker_id).await }));
        }

        handles.push(tokio::spawn({
            let pipeline = Arc::clone(&self);
            async move { pipeline.retention_loop().await }
        }));

        for handle in handles {
            let _ = handle.await;
        }
        info!("pipeline stopped");
    }

    /// Cooperatively stops every spawned task. Bounded to the ≤1s shutdown window per
    /// the concurrency model: the APQ's blocking waiters are woken explicitly rather
    /// than left to time out their own poll interval.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.apq.wake_waiters();
        self.dlq.shutdown();
    }

    async fn drain_loop(&self, worker_id: usize) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let batch_size = (BASE_DRAIN_BATCH_SIZE as u32 * self.adm.effects().batch_size_multiplier) as usize;
            let mut batch = Vec::with_capacity(batch_size);
            while batch.len() < batch_size {
                match self.apq.dequeue_blocking(&self.cancel).await {
                    Some(item) => batch.push(item),
                    None => break,
                }
            }
            if batch.is_empty() {
                if self.cancel.is_cancelled() {
                    break;
                }
                continue;
            }
            self.export_batch(batch).await;
        }
        info!(worker_id, "drain worker stopped");
    }

    async fn export_batch(&self, batch: Vec<nrdot_types::QueueItem>) {
        let started = self.clock.now();
        let records: Vec<Record> = batch.iter().map(|item| item.payload.clone()).collect();
        let count = records.len();
        let outcome = self.exporter.send(records).await;
        self.stats.record_latency(self.clock.now().duration_since(started));

        match outcome {
            ExportOutcome::Ok => {
                self.apq.record_drain_outcome(true);
                self.stats.record_outcome(true);
            }
            ExportOutcome::TransientErr => {
                self.apq.record_drain_outcome(false);
                self.stats.record_outcome(false);
                for item in &batch {
                    if let Err(err) = self.dlq.write(item.payload.kind, item.class, &item.payload.payload) {
                        warn!(error = %err, "failed to spill record to DLQ after transient export failure");
                    }
                }
            }
            ExportOutcome::PermanentErr => {
                self.apq.record_drain_outcome(false);
                self.stats.record_outcome(false);
                warn!(count, "dropping batch after permanent export failure");
            }
        }
    }

    async fn retention_loop(&self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(RETENTION_SWEEP_INTERVAL_SEC)) => {
                    match self.dlq.sweep_retention() {
                        Ok(removed) if removed > 0 => info!(removed, "swept expired DLQ segments"),
                        Ok(_) => {}
                        Err(err) => warn!(error = %err, "DLQ retention sweep failed"),
                    }
                }
            }
        }
    }

    pub fn apq(&self) -> &Arc<AdaptivePriorityQueue> {
        &self.apq
    }

    pub fn dlq(&self) -> &Arc<Dlq> {
        &self.dlq
    }

    pub fn adm(&self) -> &Arc<AdaptiveDegradationManager> {
        &self.adm
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }
}

fn keyset_to_attributes(keyset: &nrdot_types::AttributeKeySet) -> AttributeMap {
    keyset
        .pairs()
        .iter()
        .map(|(name, value)| (name.clone(), AttributeValue::String(value.clone())))
        .collect()
}

fn num_drain_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).clamp(2, 8)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use nrdot_context::TestClock;
    use nrdot_types::{AttributeMap as Attrs, Kind};

    use super::*;

    struct CountingExporter {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Exporter for CountingExporter {
        async fn send(&self, batch: Vec<Record>) -> ExportOutcome {
            self.sent.fetch_add(batch.len(), Ordering::SeqCst);
            ExportOutcome::Ok
        }
    }

    fn record(class: Class, debug: bool) -> Record {
        Record {
            kind: Kind::Metric,
            ingress_nanos: 0,
            attributes: Attrs::new(),
            class,
            debug,
            payload: vec![1, 2, 3],
        }
    }

    fn scratch_config(name: &str) -> Config {
        let mut config = Config::default();
        config.dlq.directory = std::env::temp_dir()
            .join(format!("nrdot-pipeline-test-{name}-{}", std::process::id()))
            .display()
            .to_string();
        config
    }

    #[test]
    fn accepted_record_is_enqueued() {
        let config = scratch_config("consume-accept");
        let exporter = Arc::new(CountingExporter { sent: AtomicUsize::new(0) });
        let pipeline = Pipeline::with_collaborators(
            &config,
            exporter,
            Arc::new(TestClock::new()),
            Arc::new(NullResourceSampler),
        )
        .unwrap();

        let outcome = pipeline.consume(record(Class::Normal, false));
        assert_eq!(outcome, ConsumeOutcome::Enqueued(EnqueueOutcome::Accepted));
        assert_eq!(pipeline.apq().depth(), 1);
    }

    #[test]
    fn debug_record_dropped_once_drop_debug_is_active() {
        let config = scratch_config("consume-drop-debug");
        let exporter = Arc::new(CountingExporter { sent: AtomicUsize::new(0) });
        let clock = Arc::new(TestClock::new());
        let pipeline = Pipeline::with_collaborators(&config, exporter, Arc::clone(&clock) as Arc<dyn Clock>, Arc::new(NullResourceSampler)).unwrap();

        pipeline.adm.tick(nrdot_types::PipelineState {
            mem_util_pct: 95.0,
            queue_util_pct: 0.0,
            cpu_util_pct: 0.0,
            err_rate_pct: 0.0,
            p99_latency_ms: 0.0,
        });
        assert!(pipeline.adm.effects().drop_debug);

        let outcome = pipeline.consume(record(Class::Normal, true));
        assert_eq!(outcome, ConsumeOutcome::DroppedByAdm);
        assert_eq!(pipeline.apq().depth(), 0);
    }
}
