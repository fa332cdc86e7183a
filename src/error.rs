//! Error types for bitstore
//!
//! Provides a unified error type for all storage operations. Nothing in
//! this crate retries: every variant surfaces to the immediate caller.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for bitstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Locking Errors
    // -------------------------------------------------------------------------
    /// Another handle (in this or another process) holds the exclusive lock.
    #[error("store is locked by another handle: {path}")]
    LockConflict { path: PathBuf },

    // -------------------------------------------------------------------------
    // Store Content Errors
    // -------------------------------------------------------------------------
    /// Existing file contents could not be decoded. Never auto-repaired.
    #[error("corrupt store {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("store is not open: {path}")]
    NotOpen { path: PathBuf },

    #[error("store is already open: {path}")]
    AlreadyOpen { path: PathBuf },

    // -------------------------------------------------------------------------
    // Archive Errors
    // -------------------------------------------------------------------------
    #[error("invalid archive entry: {0}")]
    InvalidArchiveEntry(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::CorruptStore {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
