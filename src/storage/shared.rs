//! Shared storage
//!
//! Per-shard lock around a backend so several threads can use it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::bitmap::Bitmap;
use crate::error::Result;
use crate::position::Position;

use super::StorageBackend;

/// A backend behind a per-shard mutex
///
/// ## Concurrency:
/// - Every call takes the lock for its whole duration, including any
///   snapshot a mutation triggers
/// - Clones share the same backend
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<Mutex<Box<dyn StorageBackend>>>,
}

impl SharedStorage {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(backend)),
        }
    }

    /// Run `f` with exclusive access to the backend
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn StorageBackend) -> T) -> T {
        let mut backend = self.inner.lock();
        f(backend.as_mut())
    }

    pub fn add(&self, pos: Position) -> Result<bool> {
        self.inner.lock().add(pos)
    }

    pub fn remove(&self, pos: Position) -> Result<bool> {
        self.inner.lock().remove(pos)
    }

    pub fn contains(&self, pos: Position) -> Result<bool> {
        self.inner.lock().contains(pos)
    }

    pub fn count(&self, row: u64) -> Result<u64> {
        self.inner.lock().count(row)
    }

    pub fn row(&self, row: u64) -> Result<Bitmap> {
        self.inner.lock().row(row)
    }

    pub fn max(&self) -> Result<Option<u64>> {
        self.inner.lock().max()
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }
}
