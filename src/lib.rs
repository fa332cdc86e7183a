//! # bitstore
//!
//! Durable per-shard bitmap storage with:
//! - Memory-mapped snapshot + append-only op log files
//! - Op-count-triggered compaction via snapshot-and-rename
//! - Row-range paging across many files with a small hot set
//! - Archive (tar) export/restore and anti-entropy block data
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Fragment layer (caller)                      │
//! │            (holds one lock per shard)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ StorageBackend
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ FileStorage │◄─────────│PagedStorage │
//!   │ (one file)  │ per page │ (hot set)   │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐   ┌─────────────┐
//!   │   Op Log    │   │   Bitmap    │
//!   │  (append)   │   │  (roaring)  │
//!   └─────────────┘   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod position;

pub mod bitmap;
pub mod oplog;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::{Config, StorageKind};
pub use position::{pos, Position, HASH_BLOCK_SIZE, MAX_ROW, SLICE_WIDTH};
pub use bitmap::Bitmap;
pub use storage::{BitIterator, FileStorage, PagedStorage, SharedStorage, StorageBackend};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bitstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
