use thiserror::Error;

/// Errors for the DLQ module.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A write failed for a reason other than the size bound; surfaced to the caller.
    #[error("DLQ I/O error on `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The payload exceeded the 50 MiB per-record bound.
    #[error("payload of {size} bytes exceeds the {limit} byte DLQ record bound")]
    TooLarge { size: usize, limit: usize },

    /// `Replay` was called while a replay was already in flight.
    #[error("a replay is already running")]
    AlreadyRunning,
}
