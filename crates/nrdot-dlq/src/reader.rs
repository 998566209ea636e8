use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use crate::{frame, Error};

/// A forward-only cursor over one segment file, used both by the replay walk and by
/// the crash-recovery scan (which simply walks to `EndOfSegment`/`Truncated` without
/// delivering anything to a consumer).
pub struct SegmentCursor {
    path: PathBuf,
    reader: BufReader<File>,
}

impl SegmentCursor {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the next frame. I/O errors (as opposed to clean end-of-segment or a
    /// truncated trailing frame) are surfaced so the caller can skip to the next
    /// segment.
    pub fn next(&mut self) -> Result<frame::ReadOutcome, Error> {
        frame::read_next(&mut self.reader).map_err(|source| Error::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}
