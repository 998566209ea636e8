use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::Error;

/// The currently-open, append-only segment file a [`crate::Dlq`] writes to.
pub struct ActiveSegment {
    path: PathBuf,
    file: File,
    size: u64,
}

impl ActiveSegment {
    /// Creates (or opens, appending) a new segment file named `<prefix>-<utc_nanos>.dlq`
    /// in `directory`.
    pub fn create(directory: &Path, file_prefix: &str, now_unix_nanos: u64) -> Result<Self, Error> {
        std::fs::create_dir_all(directory).map_err(|source| Error::Io {
            path: directory.display().to_string(),
            source,
        })?;
        let file_name = format!("{file_prefix}-{now_unix_nanos}.dlq");
        let path = directory.join(file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })?;
        let size = file
            .metadata()
            .map_err(|source| Error::Io {
                path: path.display().to_string(),
                source,
            })?
            .len();
        Ok(Self { path, file, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends `frame_bytes` and fsyncs. On success, the bytes are durable; on
    /// failure, the caller must assume nothing was persisted and surface the error.
    pub fn append_and_sync(&mut self, frame_bytes: &[u8]) -> Result<(), Error> {
        self.file.write_all(frame_bytes).map_err(|source| Error::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        self.file.sync_all().map_err(|source| Error::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        self.size += frame_bytes.len() as u64;
        Ok(())
    }

    /// Fsyncs without consuming the segment.
    pub fn sync(&self) -> Result<(), Error> {
        self.file.sync_all().map_err(|source| Error::Io {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Closes and fsyncs the segment, used on shutdown and rotation.
    pub fn close(self) -> Result<(), Error> {
        self.sync()
    }
}

/// Lists `.dlq` segment files in `directory`, ordered by creation-time embedded in the
/// file name (ascending).
pub fn list_segments(directory: &Path, file_prefix: &str) -> Result<Vec<PathBuf>, Error> {
    if !directory.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<(u64, PathBuf)> = Vec::new();
    let entries = std::fs::read_dir(directory).map_err(|source| Error::Io {
        path: directory.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: directory.display().to_string(),
            source,
        })?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(file_prefix) || !name.ends_with(".dlq") {
            continue;
        }
        let stem = &name[file_prefix.len() + 1..name.len() - 4];
        if let Ok(ts) = stem.parse::<u64>() {
            paths.push((ts, path));
        }
    }
    paths.sort_by_key(|(ts, _)| *ts);
    Ok(paths.into_iter().map(|(_, p)| p).collect())
}
