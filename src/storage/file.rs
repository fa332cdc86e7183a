//! Single-file storage
//!
//! One file holds the shard's bitmap snapshot followed by its op log.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::bitmap::Bitmap;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::oplog::{self, Op};
use crate::position::{block_rows, column_of, row_bits, row_of, Position, SLICE_WIDTH};

use super::{with_suffix, BitIterator, SnapshotIterator, StorageBackend, StoreHandle, COPY_EXT, SNAPSHOT_EXT};

/// Bitmap storage backed by a single mmap'd, exclusively locked file
///
/// ## Lifecycle
/// `new` (metadata only) → `open` → mutations → `flush`* → `close`.
/// Every read and write needs the store open; `close` on a closed store
/// and `open` on an open one are errors.
pub struct FileStorage {
    path: PathBuf,
    /// Shard number, for absolute column ids
    slice: u64,
    /// Decoded bitmap (snapshot + replayed ops)
    storage: Bitmap,
    /// Present between `open` and `close`
    handle: Option<StoreHandle>,
    /// Mutations since the last snapshot
    op_n: usize,
    max_op_n: usize,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            path: path.into(),
            slice: config.slice,
            storage: Bitmap::new(),
            handle: None,
            op_n: 0,
            max_op_n: config.max_op_count,
        }
    }

    /// Mutations since the last snapshot
    pub fn op_count(&self) -> usize {
        self.op_n
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Current on-disk size of the backing file
    pub fn file_len(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Serialized size of the current bitmap, what a snapshot would write
    pub fn snapshot_len(&self) -> usize {
        self.storage.serialized_size()
    }

    /// Absolute id of this shard's column 0
    fn column_base(&self) -> u64 {
        self.slice.wrapping_mul(SLICE_WIDTH)
    }

    fn not_open(&self) -> StoreError {
        StoreError::NotOpen {
            path: self.path.clone(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.handle.is_none() {
            return Err(self.not_open());
        }
        Ok(())
    }

    /// Apply `op` in memory and, if it changed anything, log it
    fn mutate(&mut self, op: Op) -> Result<bool> {
        let handle = match self.handle.as_mut() {
            Some(handle) => handle,
            None => return Err(self.not_open()),
        };

        if !op.apply(&mut self.storage) {
            return Ok(false);
        }

        // Keep memory in step with the file if the append fails.
        if let Err(e) = handle.append(op) {
            match op {
                Op::Add(bit) => self.storage.remove(bit),
                Op::Remove(bit) => self.storage.add(bit),
            };
            return Err(e);
        }

        self.increment_op_n()?;
        Ok(true)
    }

    /// Count a mutation; snapshot once the count exceeds the threshold
    fn increment_op_n(&mut self) -> Result<()> {
        self.op_n += 1;
        if self.op_n <= self.max_op_n {
            return Ok(());
        }
        self.flush()
    }

    fn write_snapshot(&self, snapshot_path: &Path) -> Result<()> {
        let file = File::create(snapshot_path)?;
        let mut writer = BufWriter::new(file);
        self.storage.encode_to(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    /// Copy an incoming stream to `copy_path` and check that it decodes
    fn copy_in(reader: &mut dyn Read, copy_path: &Path) -> Result<()> {
        let mut file = File::create(copy_path)?;
        io::copy(reader, &mut file)?;
        file.sync_all()?;

        let bytes = fs::read(copy_path)?;
        oplog::replay(copy_path, &bytes)?;
        Ok(())
    }

    /// Swap `replacement` in as the backing file and reopen.
    ///
    /// If the rename fails the original file is reopened and the error
    /// returned.
    fn replace_with(&mut self, replacement: &Path) -> Result<()> {
        if self.handle.is_some() {
            self.close()?;
        }

        if let Err(e) = fs::rename(replacement, &self.path) {
            let _ = fs::remove_file(replacement);
            self.open()?;
            return Err(e.into());
        }

        self.open()
    }
}

impl StorageBackend for FileStorage {
    fn add(&mut self, pos: Position) -> Result<bool> {
        self.mutate(Op::Add(pos.to_bit()))
    }

    fn remove(&mut self, pos: Position) -> Result<bool> {
        self.mutate(Op::Remove(pos.to_bit()))
    }

    fn contains(&mut self, pos: Position) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.storage.contains(pos.to_bit()))
    }

    fn count(&mut self, row: u64) -> Result<u64> {
        self.ensure_open()?;
        let (first, last) = row_bits(row);
        Ok(self.storage.count_range(first, last))
    }

    fn row(&mut self, row: u64) -> Result<Bitmap> {
        self.ensure_open()?;
        let (first, last) = row_bits(row);
        let base = self.column_base();
        Ok(self
            .storage
            .range(first, last)
            .map(|bit| base.wrapping_add(bit - first))
            .collect())
    }

    fn for_each_bit(&mut self, f: &mut dyn FnMut(u64, u64) -> Result<()>) -> Result<()> {
        self.ensure_open()?;
        let base = self.column_base();
        for bit in self.storage.iter() {
            f(row_of(bit), base.wrapping_add(column_of(bit)))?;
        }
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(StoreError::AlreadyOpen {
                path: self.path.clone(),
            });
        }

        let (handle, bitmap) = StoreHandle::open(&self.path)?;
        self.storage = bitmap;
        self.handle = Some(handle);
        self.op_n = 0;
        Ok(())
    }

    /// Snapshot to `<path>.snapshotting`, close, rename over `<path>`, reopen.
    ///
    /// The live file is only replaced once the snapshot is fully written
    /// and synced.
    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        info!(path = %self.path.display(), slice = self.slice, "snapshotting");
        let start = Instant::now();

        let snapshot_path = with_suffix(&self.path, SNAPSHOT_EXT);
        if let Err(e) = self.write_snapshot(&snapshot_path) {
            let _ = fs::remove_file(&snapshot_path);
            return Err(e);
        }

        self.replace_with(&snapshot_path)?;
        self.op_n = 0;

        info!(
            path = %self.path.display(),
            slice = self.slice,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "snapshot complete"
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.close(),
            None => Err(self.not_open()),
        }
    }

    fn max(&mut self) -> Result<Option<u64>> {
        self.ensure_open()?;
        Ok(self.storage.max())
    }

    fn iterator(&mut self) -> Result<Box<dyn BitIterator>> {
        self.ensure_open()?;
        Ok(Box::new(SnapshotIterator::new(self.storage.clone())))
    }

    /// One entry named after the file, holding its bytes up to the size
    /// sampled now. Appends made while copying are left out.
    fn write_to_archive(&mut self, archive: &mut tar::Builder<&mut dyn Write>) -> Result<()> {
        let file = File::open(&self.path)?;
        let size = file.metadata()?.len();

        let name = self
            .path
            .file_name()
            .ok_or_else(|| {
                StoreError::InvalidArchiveEntry(format!("no file name in {}", self.path.display()))
            })?
            .to_os_string();

        let mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(size);
        header.set_mode(0o600);
        header.set_mtime(mtime);
        archive.append_data(&mut header, name, file.take(size))?;
        Ok(())
    }

    /// Copy to `<path>.copying`, check it decodes, then swap it in.
    fn read_from_archive(&mut self, reader: &mut dyn Read, _name: &str) -> Result<()> {
        let copy_path = with_suffix(&self.path, COPY_EXT);

        if let Err(e) = Self::copy_in(reader, &copy_path) {
            let _ = fs::remove_file(&copy_path);
            return Err(e);
        }

        self.replace_with(&copy_path)
    }

    fn block_data(&mut self, block_id: u64) -> Result<(Vec<u64>, Vec<u64>)> {
        self.ensure_open()?;
        let mut rows = Vec::new();
        let mut columns = Vec::new();
        let (first_row, last_row) = match block_rows(block_id) {
            Some(bounds) => bounds,
            None => return Ok((rows, columns)),
        };

        let first = row_bits(first_row).0;
        let last = row_bits(last_row).1;
        for bit in self.storage.range(first, last) {
            rows.push(row_of(bit));
            columns.push(column_of(bit));
        }
        Ok((rows, columns))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.close();
        }
    }
}
