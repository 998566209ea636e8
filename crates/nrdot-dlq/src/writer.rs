use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};

use nrdot_context::Clock;
use nrdot_types::{Class, Kind, MAX_RECORD_PAYLOAD_BYTES};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{
    frame,
    interleave::Interleaver,
    metrics::Metrics,
    rate_limit::ByteRateLimiter,
    segment::{self, ActiveSegment},
    Error,
};

/// Durable, append-only spill store. Owns a single active segment, rotating it once
/// it reaches `file_size_limit_mib`. Also owns the replay pacing primitives (rate
/// limiter, interleaver, single-flight flag) since replay is just another mode of
/// operation over the same segment set.
pub struct Dlq {
    pub(crate) directory: PathBuf,
    pub(crate) file_prefix: String,
    file_size_limit_bytes: u64,
    active: Mutex<ActiveSegment>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Metrics,
    pub(crate) verify_sha256: bool,
    pub(crate) replay_concurrency: usize,
    pub(crate) rate_limiter: ByteRateLimiter,
    pub(crate) interleaver: Interleaver,
    pub(crate) replay_running: AtomicBool,
    pub(crate) retention_hours: u64,
}

impl Dlq {
    pub fn open(
        directory: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
        file_size_limit_mib: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, Error> {
        let config = nrdot_config::DlqConfig {
            file_size_limit_mib,
            ..nrdot_config::DlqConfig::default()
        };
        Self::open_with(directory, file_prefix, &config, clock)
    }

    pub fn from_config(config: &nrdot_config::DlqConfig, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        Self::open_with(config.directory.clone(), config.file_prefix.clone(), config, clock)
    }

    fn open_with(
        directory: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
        config: &nrdot_config::DlqConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, Error> {
        let directory = directory.into();
        let file_prefix = file_prefix.into();
        let active = ActiveSegment::create(&directory, &file_prefix, clock.now_unix_nanos())?;
        Ok(Self {
            directory,
            file_prefix,
            file_size_limit_bytes: config.file_size_limit_mib * 1024 * 1024,
            active: Mutex::new(active),
            clock,
            metrics: Metrics::default(),
            verify_sha256: config.verify_sha256,
            replay_concurrency: config.replay_concurrency,
            rate_limiter: ByteRateLimiter::new(config.replay_rate_mib_sec * 1024.0 * 1024.0),
            interleaver: Interleaver::new(config.interleave_ratio),
            replay_running: AtomicBool::new(false),
            retention_hours: config.retention_hours,
        })
    }

    pub fn directory(&self) -> &std::path::Path {
        &self.directory
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }

    /// Appends `payload` to the active segment, fsyncing before returning `Ok`.
    /// Rotates the active segment first if the new frame would exceed the size
    /// bound. Writes from concurrent callers are serialized on the active segment
    /// lock; no frame interleaving is possible.
    pub fn write(&self, kind: Kind, class: Class, payload: &[u8]) -> Result<(), Error> {
        if payload.len() > MAX_RECORD_PAYLOAD_BYTES {
            return Err(Error::TooLarge {
                size: payload.len(),
                limit: MAX_RECORD_PAYLOAD_BYTES,
            });
        }

        let timestamp_nanos = self.clock.now_unix_nanos();
        let frame_bytes = frame::encode(kind, class, timestamp_nanos, payload);

        let mut active = self.active.lock();
        if active.size() + frame_bytes.len() as u64 > self.file_size_limit_bytes && active.size() > 0 {
            self.rotate(&mut active)?;
        }
        active.append_and_sync(&frame_bytes)?;
        self.metrics.incr_bytes_written(frame_bytes.len() as u64);
        self.metrics.incr_records_written();
        Ok(())
    }

    fn rotate(&self, active: &mut ActiveSegment) -> Result<(), Error> {
        let old_path = active.path().display().to_string();
        let new_segment = ActiveSegment::create(&self.directory, &self.file_prefix, self.clock.now_unix_nanos())?;
        let old = std::mem::replace(active, new_segment);
        info!(old_segment = %old_path, new_segment = %active.path().display(), "rotated DLQ segment");
        old.close()?;
        Ok(())
    }

    /// Lists all segment files, in creation-time order, for the replay walk.
    pub fn segments(&self) -> Result<Vec<PathBuf>, Error> {
        segment::list_segments(&self.directory, &self.file_prefix)
    }

    /// Closes and fsyncs the active segment. Called on shutdown; bounded by the ≤1s
    /// shutdown window since it is a single fsync on an already-flushed file.
    pub fn shutdown(&self) {
        let active = self.active.lock();
        if let Err(err) = active.sync() {
            warn!(error = %err, "failed to fsync active DLQ segment on shutdown");
        }
    }

    pub fn metrics(&self) -> crate::metrics::MetricsSnapshot {
        let file_count = self.segments().map(|s| s.len()).unwrap_or(0);
        self.metrics.snapshot(file_count)
    }

    /// The interleaver gating replay vs. live slots. Live ingress paths call
    /// [`Interleaver::allow_live`] on this same instance so that the two sides share
    /// one atomic ratio counter.
    pub fn interleaver(&self) -> &Interleaver {
        &self.interleaver
    }

    /// The active segment's current path, used by replay to skip the segment still
    /// being appended to.
    pub(crate) fn active_segment_path(&self) -> PathBuf {
        self.active.lock().path().to_path_buf()
    }

    /// Deletes segments (other than the active one) whose last-modified time is
    /// older than `retention_hours`. Returns the number of segments removed.
    pub fn sweep_retention(&self) -> Result<usize, Error> {
        crate::retention::sweep(self)
    }
}
