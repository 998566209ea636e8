#![warn(rust_2021_compatibility, unreachable_pub)]

//! Durable, append-only spill store with per-record integrity verification and
//! rate-limited, interleaved replay.
//!
//! Module boundary: [`frame`] owns encode/decode of one persisted record;
//! [`segment`] owns the append-only file handle and segment naming/listing;
//! [`writer`] (the [`Dlq`] struct itself) owns rotation and the fsync-on-write
//! contract; [`reader`] owns the forward-only cursor used by both recovery scanning
//! and the replay walk; [`rate_limit`] owns the byte-based sliding-window token
//! bucket pacing replay; [`interleave`] owns the atomic query-and-consume
//! `AllowReplay`/`AllowLive` primitive; [`retention`] owns the hourly sweep;
//! [`replay`] ties rate limiting, interleaving and segment walking together behind
//! the single-flight `Dlq::replay` entry point.

mod error;
mod frame;
mod interleave;
mod metrics;
mod rate_limit;
mod reader;
mod replay;
mod retention;
mod segment;
mod writer;

pub use error::Error;
pub use frame::{DecodedFrame, ReadOutcome};
pub use interleave::Interleaver;
pub use metrics::MetricsSnapshot;
pub use rate_limit::ByteRateLimiter;
pub use reader::SegmentCursor;
pub use replay::ReplayConsumer;
pub use writer::Dlq;
