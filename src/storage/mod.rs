//! Storage Module
//!
//! Persistent bitmap storage for one shard.
//!
//! ## Responsibilities
//! - Durable point mutation through a snapshot + op log file
//! - Row extraction, counting and ascending iteration
//! - Compaction (snapshot-and-rename) bounded by an op count
//! - Archive export/restore and anti-entropy block data
//!
//! ## Backends
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ FileStorage                                            │
//! │   <path>            snapshot + op log, mmap'd, flocked │
//! ├────────────────────────────────────────────────────────┤
//! │ PagedStorage                                           │
//! │   <path>.0.page     rows [0, 2^20)                     │
//! │   <path>.1.page     rows [2^20, 2^21)                  │
//! │   ...               one FileStorage per row range,     │
//! │                     at most `hot_capacity` tracked hot │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Every backend method takes `&mut self`: callers serialize access per
//! shard. [`SharedStorage`] is that per-shard lock for callers that share a
//! backend across threads. The file lock only keeps other processes (and
//! other handles) from opening the same file.

pub mod archive;
mod file;
mod handle;
mod iterator;
mod paged;
mod shared;

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub use file::FileStorage;
pub use handle::StoreHandle;
pub use iterator::{BitIterator, PagedIterator, SnapshotIterator};
pub use paged::{Page, PagedStorage, PAGE_EXT, ROW_RANGE_BITS};
pub use shared::SharedStorage;

use crate::bitmap::Bitmap;
use crate::config::{Config, StorageKind};
use crate::error::Result;
use crate::position::Position;

/// Suffix of the temporary file a snapshot is written to
pub const SNAPSHOT_EXT: &str = ".snapshotting";

/// Suffix of the temporary file an archive restore is copied to
pub const COPY_EXT: &str = ".copying";

/// Capabilities shared by single-file and paged storage
pub trait StorageBackend: Send {
    /// Set a bit. Returns whether its state changed.
    fn add(&mut self, pos: Position) -> Result<bool>;

    /// Clear a bit. Returns whether its state changed.
    fn remove(&mut self, pos: Position) -> Result<bool>;

    fn contains(&mut self, pos: Position) -> Result<bool>;

    /// Set bits in `row`
    fn count(&mut self, row: u64) -> Result<u64>;

    /// Owned copy of one row, as absolute column ids
    fn row(&mut self, row: u64) -> Result<Bitmap>;

    /// Visit every set bit in ascending order as `(row, absolute column)`.
    /// Stops at, and returns, the first error `f` returns.
    fn for_each_bit(&mut self, f: &mut dyn FnMut(u64, u64) -> Result<()>) -> Result<()>;

    fn open(&mut self) -> Result<()>;

    /// Compact to a fresh snapshot
    fn flush(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Highest set bit position, `None` when empty
    fn max(&mut self) -> Result<Option<u64>>;

    /// Ascending bit positions over a snapshot of the current contents
    fn iterator(&mut self) -> Result<Box<dyn BitIterator>>;

    /// Append one entry per backing file to `archive`
    fn write_to_archive(&mut self, archive: &mut tar::Builder<&mut dyn Write>) -> Result<()>;

    /// Replace the file named by archive entry `name` with `reader`'s bytes
    fn read_from_archive(&mut self, reader: &mut dyn Read, name: &str) -> Result<()>;

    /// `(rows, columns)` of every bit in hash block `block_id`, ascending
    fn block_data(&mut self, block_id: u64) -> Result<(Vec<u64>, Vec<u64>)>;

    fn path(&self) -> &Path;
}

/// Build the backend `config.kind` names and open it
pub fn open(path: impl Into<PathBuf>, config: &Config) -> Result<Box<dyn StorageBackend>> {
    config.validate()?;

    let mut backend: Box<dyn StorageBackend> = match config.kind {
        StorageKind::File => Box::new(FileStorage::new(path, config)),
        StorageKind::Paged => Box::new(PagedStorage::new(path, config)),
    };
    backend.open()?;
    Ok(backend)
}

/// `path` with `suffix` appended to its final component
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
