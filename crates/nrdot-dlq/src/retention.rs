use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::{segment, writer::Dlq, Error};

/// Deletes segments (other than the one currently being appended to) whose
/// last-modified time is older than `dlq.retention_hours`. Intended to be driven by a
/// periodic (hourly) task; exposed here as a single sweep so callers control the
/// cadence.
pub fn sweep(dlq: &Dlq) -> Result<usize, Error> {
    let active_path = dlq.active_segment_path();
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(dlq.retention_hours * 3600))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let segments = segment::list_segments(&dlq.directory, &dlq.file_prefix)?;
    let mut removed = 0usize;
    for path in segments {
        if path == active_path {
            continue;
        }
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to stat DLQ segment during retention sweep");
                continue;
            }
        };
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    info!(path = %path.display(), "retired DLQ segment past retention");
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to remove expired DLQ segment");
                }
            }
        }
    }
    if removed > 0 {
        dlq.metrics.incr_segments_retired(removed as u64);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nrdot_context::SystemClock;
    use nrdot_types::{Class, Kind};

    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("nrdot-dlq-retention-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn sweep_removes_only_segments_past_retention() {
        let dir = scratch_dir("sweep");
        let config = nrdot_config::DlqConfig {
            directory: dir.display().to_string(),
            retention_hours: 1,
            ..nrdot_config::DlqConfig::default()
        };
        let dlq = Dlq::from_config(&config, Arc::new(SystemClock)).unwrap();
        dlq.write(Kind::Log, Class::Normal, b"old").unwrap();
        dlq.write(Kind::Log, Class::Normal, b"trigger-rotation").unwrap();

        let segments = dlq.segments().unwrap();
        assert_eq!(segments.len(), 2);
        let old_segment = &segments[0];
        let file = std::fs::OpenOptions::new().write(true).open(old_segment).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH).unwrap();

        let removed = sweep(&dlq).unwrap();
        assert_eq!(removed, 1);
        assert!(!old_segment.exists());
        // The active segment is never swept even if its mtime looks old.
        assert_eq!(dlq.segments().unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
