//! Op record definitions
//!
//! Defines the structure of individual op log records.

use std::io;

use serde::{Deserialize, Serialize};

use crate::bitmap::Bitmap;

/// bincode payload: u32 variant tag + u64 bit
const PAYLOAD_SIZE: usize = 12;

/// Payload (12) + CRC32 (4)
pub const OP_RECORD_SIZE: usize = PAYLOAD_SIZE + 4;

/// A single logged mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Set a bit
    Add(u64),

    /// Clear a bit
    Remove(u64),
}

impl Op {
    pub fn bit(&self) -> u64 {
        match *self {
            Op::Add(bit) | Op::Remove(bit) => bit,
        }
    }

    /// Apply to a bitmap, returning whether it changed
    pub fn apply(&self, bitmap: &mut Bitmap) -> bool {
        match *self {
            Op::Add(bit) => bitmap.add(bit),
            Op::Remove(bit) => bitmap.remove(bit),
        }
    }

    /// Encode as `[payload][crc32]`
    pub fn encode(&self) -> io::Result<[u8; OP_RECORD_SIZE]> {
        let payload = bincode::serialize(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if payload.len() != PAYLOAD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected op payload size {}", payload.len()),
            ));
        }

        let mut record = [0u8; OP_RECORD_SIZE];
        record[..PAYLOAD_SIZE].copy_from_slice(&payload);
        record[PAYLOAD_SIZE..].copy_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        Ok(record)
    }

    /// Decode one record, verifying its checksum
    pub fn decode(record: &[u8]) -> Result<Self, String> {
        if record.len() != OP_RECORD_SIZE {
            return Err(format!(
                "op record is {} bytes, expected {}",
                record.len(),
                OP_RECORD_SIZE
            ));
        }

        let (payload, crc) = record.split_at(PAYLOAD_SIZE);
        let mut stored = [0u8; 4];
        stored.copy_from_slice(crc);
        let stored = u32::from_le_bytes(stored);
        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(format!(
                "op checksum mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            ));
        }

        bincode::deserialize(payload).map_err(|e| format!("op decode: {}", e))
    }
}
