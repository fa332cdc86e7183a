//! Configuration for bitstore
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, StoreError};

/// Default number of mutations between compactions.
pub const DEFAULT_MAX_OP_COUNT: usize = 2000;

/// Default number of pages a paged store keeps in its hot set.
pub const DEFAULT_HOT_CAPACITY: usize = 4;

/// Main configuration for a storage backend
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Compaction Configuration
    // -------------------------------------------------------------------------
    /// Mutations allowed before a store snapshots itself.
    /// The snapshot fires on the mutation that exceeds this count.
    pub max_op_count: usize,

    // -------------------------------------------------------------------------
    // Shard Configuration
    // -------------------------------------------------------------------------
    /// Shard (slice) number the store belongs to. Only used to report
    /// absolute column ids from `row` and `for_each_bit`.
    pub slice: u64,

    /// Which backend `storage::open` builds
    pub kind: StorageKind,

    // -------------------------------------------------------------------------
    // Paging Configuration
    // -------------------------------------------------------------------------
    /// Hot-set capacity of a paged store
    pub hot_capacity: usize,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// One mmap'd file for the whole shard
    File,

    /// One file per 2^20-row range, opened on demand
    Paged,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_op_count: DEFAULT_MAX_OP_COUNT,
            slice: 0,
            kind: StorageKind::File,
            hot_capacity: DEFAULT_HOT_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no store can run with
    pub fn validate(&self) -> Result<()> {
        if self.max_op_count == 0 {
            return Err(StoreError::Config(
                "max_op_count must be at least 1".to_string(),
            ));
        }
        if self.hot_capacity == 0 {
            return Err(StoreError::Config(
                "hot_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the compaction threshold
    pub fn max_op_count(mut self, count: usize) -> Self {
        self.config.max_op_count = count;
        self
    }

    /// Set the shard number
    pub fn slice(mut self, slice: u64) -> Self {
        self.config.slice = slice;
        self
    }

    /// Set the backend kind
    pub fn kind(mut self, kind: StorageKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Set the paged hot-set capacity
    pub fn hot_capacity(mut self, capacity: usize) -> Self {
        self.config.hot_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
