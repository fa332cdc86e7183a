//! Op Log Module
//!
//! Makes every store file a prefix-durable log: the last snapshot followed
//! by one record per state-changing mutation since that snapshot.
//!
//! ## Responsibilities
//! - Append one fixed-size record per mutation to the live file
//! - CRC32 checksums for corruption detection
//! - Replay snapshot + records into a bitmap on open
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Snapshot (roaring treemap, portable)    │
//! ├─────────────────────────────────────────┤
//! │ Record 1                                │
//! │ ┌──────────┬────────────┬─────────────┐ │
//! │ │ Kind (4) │ Bit (8)    │ CRC32 (4)   │ │
//! │ └──────────┴────────────┴─────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Kind + Bit are the bincode encoding of [`Op`]. A short trailing record
//! or a checksum mismatch makes the whole file corrupt: replay never
//! truncates or skips.

mod entry;
mod reader;
mod writer;

pub use entry::{Op, OP_RECORD_SIZE};
pub use reader::{replay, ReplaySummary};
pub use writer::OpLogWriter;
