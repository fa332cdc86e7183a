//! Store Handle
//!
//! Owns the OS resources of one open store file: the append-mode file
//! descriptor (also the op log target), its exclusive advisory lock, and a
//! read-only mapping of the file as it was at open time.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::error::{Result, StoreError};
use crate::oplog::{self, Op, OpLogWriter};

/// Open file + lock + mapping, released exactly once
///
/// `close` is the fallible, explicit release (sync, unmap, unlock).
/// If a handle is dropped without `close`, `Drop` still unlocks.
pub struct StoreHandle {
    path: PathBuf,
    log: OpLogWriter,
    mmap: Option<Mmap>,
    /// Whether this handle still holds the advisory lock
    locked: bool,
}

impl StoreHandle {
    /// Open (creating if absent), lock, map and decode a store file.
    ///
    /// An empty file is initialized with an empty serialized bitmap first.
    pub fn open(path: &Path) -> Result<(Self, Bitmap)> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                return Err(StoreError::LockConflict {
                    path: path.to_path_buf(),
                });
            }
            return Err(e.into());
        }

        // From here on, Drop releases the lock on every error path.
        let mut handle = Self {
            path: path.to_path_buf(),
            log: OpLogWriter::new(file),
            mmap: None,
            locked: true,
        };

        let mut len = handle.log.file().metadata()?.len();
        if len == 0 {
            let mut writer = BufWriter::new(handle.log.file());
            Bitmap::new().encode_to(&mut writer)?;
            writer.flush()?;
            drop(writer);
            len = handle.log.file().metadata()?.len();
        }

        // SAFETY: the file is exclusively locked by this handle and only ever
        // appended to, so the mapped prefix is never modified while mapped.
        let mmap = unsafe { MmapOptions::new().len(len as usize).map(handle.log.file())? };

        #[cfg(unix)]
        mmap.advise(memmap2::Advice::Random)?;

        let (bitmap, summary) = oplog::replay(path, &mmap)?;
        debug!(
            path = %path.display(),
            bytes = len,
            snapshot_bytes = summary.snapshot_bytes,
            ops = summary.ops_applied,
            "store opened"
        );

        handle.mmap = Some(mmap);
        Ok((handle, bitmap))
    }

    /// Append one op record to the file
    pub fn append(&mut self, op: Op) -> Result<()> {
        self.log.append(op)
    }

    /// Length of the region mapped at open time
    pub fn mapped_len(&self) -> usize {
        self.mmap.as_ref().map_or(0, |m| m.len())
    }

    /// Op records appended since open
    pub fn appended(&self) -> u64 {
        self.log.appended()
    }

    /// Unmap, fsync, unlock and close the file
    pub fn close(mut self) -> Result<()> {
        self.mmap = None;
        self.log.sync()?;
        self.log.file().unlock()?;
        self.locked = false;
        debug!(path = %self.path.display(), "store closed");
        Ok(())
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if self.locked {
            let _ = self.log.file().unlock();
            self.locked = false;
        }
    }
}
