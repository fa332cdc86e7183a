//! Op Log Replay
//!
//! Rebuilds a bitmap from a store file's bytes.

use std::path::Path;

use crate::bitmap::Bitmap;
use crate::error::{Result, StoreError};

use super::{Op, OP_RECORD_SIZE};

/// Result of a replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Bytes taken by the leading snapshot
    pub snapshot_bytes: usize,

    /// Records applied after the snapshot
    pub ops_applied: u64,
}

/// Decode the snapshot at the front of `bytes`, then apply every op record.
///
/// `path` only labels errors.
pub fn replay(path: &Path, bytes: &[u8]) -> Result<(Bitmap, ReplaySummary)> {
    let (mut bitmap, mut rest) = Bitmap::decode(bytes)
        .map_err(|e| StoreError::corrupt(path, format!("unmarshal snapshot: {}", e)))?;
    let snapshot_bytes = bytes.len() - rest.len();

    let mut ops_applied = 0;
    while !rest.is_empty() {
        if rest.len() < OP_RECORD_SIZE {
            return Err(StoreError::corrupt(
                path,
                format!(
                    "truncated op record at offset {}",
                    bytes.len() - rest.len()
                ),
            ));
        }

        let (record, tail) = rest.split_at(OP_RECORD_SIZE);
        let op = Op::decode(record).map_err(|reason| {
            StoreError::corrupt(
                path,
                format!("offset {}: {}", bytes.len() - rest.len(), reason),
            )
        })?;
        op.apply(&mut bitmap);
        ops_applied += 1;
        rest = tail;
    }

    Ok((
        bitmap,
        ReplaySummary {
            snapshot_bytes,
            ops_applied,
        },
    ))
}
