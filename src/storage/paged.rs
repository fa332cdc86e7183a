//! Paged storage
//!
//! Splits a shard's row space into `2^ROW_RANGE_BITS`-row ranges, one
//! [`FileStorage`] page file per range, opened on first touch.
//!
//! ## Hot set
//! `hot` is the ordered sequence of recently used range ids. A touch
//! appends the range unless it is already the last entry, so the sequence
//! may repeat ids. Once it grows past `hot_capacity` it collapses to its
//! first (oldest) entry only. This is retain-oldest, not LRU.
//!
//! Pages dropped from the hot set are closed, except the page in use by
//! the current call, which stays open until the next sweep or `close`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bitmap::Bitmap;
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::position::{block_rows, Position};

use super::{BitIterator, FileStorage, PagedIterator, StorageBackend};

/// Row bits covered by one page: `range_id = row >> ROW_RANGE_BITS`
pub const ROW_RANGE_BITS: u32 = 20;

/// Extension of page files: `<base>.<range_id>.page`
pub const PAGE_EXT: &str = "page";

/// One row range's store
pub struct Page {
    range_id: u64,
    /// Open order within the owning PagedStorage (1-based)
    serial: u64,
    storage: FileStorage,
}

impl Page {
    pub fn range_id(&self) -> u64 {
        self.range_id
    }

    /// Distinguishes separate opens of the same range
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// First row this page covers
    pub fn first_row(&self) -> u64 {
        self.range_id << ROW_RANGE_BITS
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut FileStorage {
        &mut self.storage
    }
}

/// Bitmap storage paged by row range
pub struct PagedStorage {
    /// Base path; pages live at `<path>.<range_id>.page`
    path: PathBuf,
    config: Config,
    /// Recently used range ids, oldest first
    hot: Vec<u64>,
    /// Every open page
    pages: BTreeMap<u64, Page>,
    /// Pages opened so far
    pages_opened: u64,
}

impl PagedStorage {
    pub fn new(path: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            path: path.into(),
            config: config.clone(),
            hot: Vec::new(),
            pages: BTreeMap::new(),
            pages_opened: 0,
        }
    }

    /// Hot-set sequence, oldest first
    pub fn hot_ranges(&self) -> &[u64] {
        &self.hot
    }

    /// Range ids of pages currently open
    pub fn open_ranges(&self) -> Vec<u64> {
        self.pages.keys().copied().collect()
    }

    /// Pages opened over this store's lifetime
    pub fn pages_opened(&self) -> u64 {
        self.pages_opened
    }

    /// File path of the page for `range_id`
    pub fn page_path(&self, range_id: u64) -> PathBuf {
        page_path(&self.path, range_id)
    }

    /// Page owning `row`, opening it if needed, recorded as used
    pub fn get_page(&mut self, row: u64) -> Result<&mut Page> {
        let range_id = row >> ROW_RANGE_BITS;

        if !self.pages.contains_key(&range_id) {
            let page = self.open_page(range_id)?;
            self.pages.insert(range_id, page);
        }
        self.used(range_id);
        self.sweep(range_id);

        self.pages
            .get_mut(&range_id)
            .ok_or_else(|| StoreError::NotOpen {
                path: page_path(&self.path, range_id),
            })
    }

    /// Range ids of every page file on disk, ascending numerically
    pub fn page_ids(&self) -> Result<Vec<u64>> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let base = match self.path.file_name().and_then(|n| n.to_str()) {
            Some(base) => base.to_string(),
            None => return Ok(Vec::new()),
        };

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Some(id) = parse_page_name(&base, name) {
                    ids.push(id);
                }
            }
        }

        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Compact every page on disk, hot or not. Returns the page count.
    pub fn flush_all(&mut self) -> Result<usize> {
        let ids = self.page_ids()?;
        self.for_each_page(&ids, |page| page.flush())?;
        info!(path = %self.path.display(), pages = ids.len(), "all pages compacted");
        Ok(ids.len())
    }

    fn open_page(&mut self, range_id: u64) -> Result<Page> {
        let path = self.page_path(range_id);
        let mut storage = FileStorage::new(&path, &self.config);
        storage.open()?;

        self.pages_opened += 1;
        debug!(path = %path.display(), range_id, "page opened");

        Ok(Page {
            range_id,
            serial: self.pages_opened,
            storage,
        })
    }

    /// Record a touch, collapsing the hot set to its oldest entry when full
    fn used(&mut self, range_id: u64) {
        if self.hot.last() != Some(&range_id) {
            self.hot.push(range_id);
        }
        if self.hot.len() > self.config.hot_capacity {
            self.hot.truncate(1);
        }
    }

    /// Close open pages that are neither hot nor `keep`
    fn sweep(&mut self, keep: u64) {
        let stale: Vec<u64> = self
            .pages
            .keys()
            .copied()
            .filter(|id| *id != keep && !self.hot.contains(id))
            .collect();

        for range_id in stale {
            if let Some(mut page) = self.pages.remove(&range_id) {
                debug!(range_id, "page evicted");
                if let Err(e) = page.storage.close() {
                    warn!(range_id, error = %e, "closing evicted page failed");
                }
            }
        }
    }

    fn with_page<T>(&mut self, row: u64, f: impl FnOnce(&mut FileStorage) -> Result<T>) -> Result<T> {
        let page = self.get_page(row)?;
        f(&mut page.storage)
    }

    fn for_each_page(&mut self, ids: &[u64], mut f: impl FnMut(&mut FileStorage) -> Result<()>) -> Result<()> {
        for &range_id in ids {
            self.with_page(range_id << ROW_RANGE_BITS, &mut f)?;
        }
        Ok(())
    }
}

impl StorageBackend for PagedStorage {
    fn add(&mut self, pos: Position) -> Result<bool> {
        self.with_page(pos.row, |page| page.add(pos))
    }

    fn remove(&mut self, pos: Position) -> Result<bool> {
        self.with_page(pos.row, |page| page.remove(pos))
    }

    fn contains(&mut self, pos: Position) -> Result<bool> {
        self.with_page(pos.row, |page| page.contains(pos))
    }

    fn count(&mut self, row: u64) -> Result<u64> {
        self.with_page(row, |page| page.count(row))
    }

    fn row(&mut self, row: u64) -> Result<Bitmap> {
        self.with_page(row, |page| page.row(row))
    }

    fn for_each_bit(&mut self, f: &mut dyn FnMut(u64, u64) -> Result<()>) -> Result<()> {
        let ids = self.page_ids()?;
        self.for_each_page(&ids, |page| page.for_each_bit(&mut *f))
    }

    /// Pages open lazily; only the configuration is checked here
    fn open(&mut self) -> Result<()> {
        self.config.validate()
    }

    /// Snapshots only pages in the hot set
    fn flush(&mut self) -> Result<()> {
        let mut hot = self.hot.clone();
        hot.sort_unstable();
        hot.dedup();

        for range_id in hot {
            if let Some(page) = self.pages.get_mut(&range_id) {
                page.storage.flush()?;
            }
        }
        Ok(())
    }

    /// Closes every open page and empties the hot set. Reports the first
    /// failure after attempting them all.
    fn close(&mut self) -> Result<()> {
        self.hot.clear();
        let mut first_err = None;
        for (range_id, mut page) in std::mem::take(&mut self.pages) {
            if let Err(e) = page.storage.close() {
                warn!(range_id, error = %e, "closing page failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn max(&mut self) -> Result<Option<u64>> {
        let ids = self.page_ids()?;
        let mut max = None;
        self.for_each_page(&ids, |page| {
            max = max.max(page.max()?);
            Ok(())
        })?;
        Ok(max)
    }

    /// Merges every on-disk page. Pages are pushed highest range first so
    /// the lowest range is drained first.
    fn iterator(&mut self) -> Result<Box<dyn BitIterator>> {
        let ids = self.page_ids()?;
        let mut merged = PagedIterator::new();
        for &range_id in ids.iter().rev() {
            let page = self.get_page(range_id << ROW_RANGE_BITS)?;
            merged.push(page.storage.iterator()?);
        }
        Ok(Box::new(merged))
    }

    fn write_to_archive(&mut self, archive: &mut tar::Builder<&mut dyn Write>) -> Result<()> {
        let ids = self.page_ids()?;
        self.for_each_page(&ids, |page| page.write_to_archive(archive))
    }

    /// `name` must be a page file name, `<base>.<range_id>.page`
    fn read_from_archive(&mut self, reader: &mut dyn Read, name: &str) -> Result<()> {
        let range_id = parse_range_id(name).ok_or_else(|| {
            StoreError::InvalidArchiveEntry(format!("not a page file name: {}", name))
        })?;
        self.with_page(range_id << ROW_RANGE_BITS, |page| {
            page.read_from_archive(reader, name)
        })
    }

    /// Collects from every page the block's rows fall in, lowest first
    fn block_data(&mut self, block_id: u64) -> Result<(Vec<u64>, Vec<u64>)> {
        let mut rows = Vec::new();
        let mut columns = Vec::new();
        let (first_row, last_row) = match block_rows(block_id) {
            Some(bounds) => bounds,
            None => return Ok((rows, columns)),
        };
        let ids: Vec<u64> = ((first_row >> ROW_RANGE_BITS)..=(last_row >> ROW_RANGE_BITS)).collect();

        self.for_each_page(&ids, |page| {
            let (r, c) = page.block_data(block_id)?;
            rows.extend(r);
            columns.extend(c);
            Ok(())
        })?;
        Ok((rows, columns))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn page_path(base: &Path, range_id: u64) -> PathBuf {
    super::with_suffix(base, &format!(".{}.{}", range_id, PAGE_EXT))
}

/// `<base>.<id>.page` → id, for file names under this store's base
fn parse_page_name(base: &str, name: &str) -> Option<u64> {
    name.strip_prefix(base)?
        .strip_prefix('.')?
        .strip_suffix(PAGE_EXT)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

/// Range id from any `<...>.<id>.page` name
fn parse_range_id(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(PAGE_EXT)?.strip_suffix('.')?;
    let (_, id) = stem.rsplit_once('.')?;
    id.parse().ok()
}
