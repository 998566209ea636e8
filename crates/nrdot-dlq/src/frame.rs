use std::io::{BufRead, Read, Write};

use nrdot_types::{Class, Kind};
use sha2::{Digest, Sha256};

/// `kind_tag(1) + class_tag(1) + timestamp_nanos(8, BE) + payload_size(8, BE)`.
///
/// The distilled frame header carries only a `kind_tag`; the [`crate::DlqRecord`]
/// data model additionally persists `class`, so a second one-byte tag is added here
/// rather than leaving it unrecoverable from a replayed frame (see DESIGN.md).
pub const HEADER_LEN: usize = 1 + 1 + 8 + 8;

/// A successfully decoded frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub kind: Kind,
    pub class: Class,
    pub timestamp_nanos: u64,
    pub payload: Vec<u8>,
    /// Hex-encoded SHA-256 as read from the end sentinel.
    pub persisted_sha256: String,
    /// SHA-256 recomputed over `payload` at read time.
    pub computed_sha256: String,
}

/// Result of reading one frame from a segment.
pub enum ReadOutcome {
    /// A fully-framed record, start to end sentinel, was read.
    Frame(DecodedFrame),
    /// Clean end of segment (no more start sentinels).
    EndOfSegment,
    /// A partially-written frame was encountered (crash mid-write); discarded per the
    /// write contract. The segment is considered ended at this point.
    Truncated,
}

/// Serializes one record into its on-disk frame representation.
pub fn encode(kind: Kind, class: Class, timestamp_nanos: u64, payload: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    let digest = hasher.finalize();
    let sha256_hex = hex_encode(&digest);

    let mut out = Vec::with_capacity(payload.len() + HEADER_LEN + 96);
    let _ = write!(out, "--- DLQ RECORD START {timestamp_nanos} ---\n");
    out.push(kind.tag());
    out.push(class_tag(class));
    out.extend_from_slice(&timestamp_nanos.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    out.extend_from_slice(payload);
    let _ = write!(out, "\n--- DLQ RECORD END {timestamp_nanos} [SHA256:{sha256_hex}] ---\n");
    out
}

fn class_tag(class: Class) -> u8 {
    match class {
        Class::Critical => 0,
        Class::High => 1,
        Class::Normal => 2,
    }
}

fn class_from_tag(tag: u8) -> Option<Class> {
    match tag {
        0 => Some(Class::Critical),
        1 => Some(Class::High),
        2 => Some(Class::Normal),
        _ => None,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Reads one frame sequentially from a buffered reader, discarding any trailing frame
/// whose end sentinel is missing (the crash-recovery contract).
pub fn read_next(reader: &mut impl BufRead) -> std::io::Result<ReadOutcome> {
    let mut start_line = String::new();
    let n = reader.read_line(&mut start_line)?;
    if n == 0 {
        return Ok(ReadOutcome::EndOfSegment);
    }
    let timestamp_nanos = match parse_start_sentinel(&start_line) {
        Some(ts) => ts,
        None => return Ok(ReadOutcome::Truncated),
    };

    let mut header = [0u8; HEADER_LEN];
    if reader.read_exact(&mut header).is_err() {
        return Ok(ReadOutcome::Truncated);
    }
    let kind = match Kind::from_tag(header[0]) {
        Some(k) => k,
        None => return Ok(ReadOutcome::Truncated),
    };
    let class = match class_from_tag(header[1]) {
        Some(c) => c,
        None => return Ok(ReadOutcome::Truncated),
    };
    let header_ts = u64::from_be_bytes(header[2..10].try_into().unwrap());
    let payload_size = u64::from_be_bytes(header[10..18].try_into().unwrap()) as usize;

    if header_ts != timestamp_nanos {
        return Ok(ReadOutcome::Truncated);
    }

    let mut payload = vec![0u8; payload_size];
    if reader.read_exact(&mut payload).is_err() {
        return Ok(ReadOutcome::Truncated);
    }

    let mut sep = [0u8; 1];
    if reader.read_exact(&mut sep).is_err() || sep[0] != b'\n' {
        return Ok(ReadOutcome::Truncated);
    }

    let mut end_line = String::new();
    if reader.read_line(&mut end_line)? == 0 {
        return Ok(ReadOutcome::Truncated);
    }
    let persisted_sha256 = match parse_end_sentinel(&end_line, timestamp_nanos) {
        Some(hex) => hex,
        None => return Ok(ReadOutcome::Truncated),
    };

    let mut hasher = Sha256::new();
    hasher.update(&payload);
    let computed_sha256 = hex_encode(&hasher.finalize());

    Ok(ReadOutcome::Frame(DecodedFrame {
        kind,
        class,
        timestamp_nanos,
        payload,
        persisted_sha256,
        computed_sha256,
    }))
}

fn parse_start_sentinel(line: &str) -> Option<u64> {
    let line = line.trim_end();
    let rest = line.strip_prefix("--- DLQ RECORD START ")?;
    let rest = rest.strip_suffix(" ---")?;
    rest.parse().ok()
}

fn parse_end_sentinel(line: &str, expected_ts: u64) -> Option<String> {
    let line = line.trim_end();
    let rest = line.strip_prefix("--- DLQ RECORD END ")?;
    let (ts_str, rest) = rest.split_once(' ')?;
    if ts_str.parse::<u64>().ok()? != expected_ts {
        return None;
    }
    let rest = rest.strip_prefix("[SHA256:")?;
    let hex = rest.strip_suffix("] ---")?;
    Some(hex.to_string())
}
