//! Op Log Writer
//!
//! Appends records to the live store file.

use std::fs::File;
use std::io::Write;

use crate::error::Result;

use super::Op;

/// Appends op records to a store file opened in append mode
pub struct OpLogWriter {
    file: File,
    /// Records appended through this writer
    appended: u64,
}

impl OpLogWriter {
    /// Wrap a file handle opened with `append(true)`
    pub fn new(file: File) -> Self {
        Self { file, appended: 0 }
    }

    /// Append one record. The write goes straight to the file, unbuffered.
    pub fn append(&mut self, op: Op) -> Result<()> {
        let record = op.encode()?;
        self.file.write_all(&record)?;
        self.appended += 1;
        Ok(())
    }

    /// Force file contents to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Records appended since this writer was created
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}
