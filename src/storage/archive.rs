//! Archive export and restore
//!
//! Whole-backend backup to, and restore from, a tar stream. Each backing
//! file is one entry named by its file name.

use std::io::{Read, Write};

use tracing::info;

use crate::error::{Result, StoreError};

use super::StorageBackend;

/// Write every file of `backend` into a finished tar stream on `out`
pub fn export(backend: &mut dyn StorageBackend, out: &mut dyn Write) -> Result<()> {
    let mut archive = tar::Builder::new(out);
    backend.write_to_archive(&mut archive)?;
    archive.finish()?;
    info!(path = %backend.path().display(), "archive exported");
    Ok(())
}

/// Replace `backend`'s files with every entry of the tar stream on `input`.
///
/// Returns the number of entries restored.
pub fn restore(backend: &mut dyn StorageBackend, input: &mut dyn Read) -> Result<usize> {
    let mut archive = tar::Archive::new(input);
    let mut restored = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry
            .path()?
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| StoreError::InvalidArchiveEntry("entry without a file name".to_string()))?;

        backend.read_from_archive(&mut entry, &name)?;
        restored += 1;
    }

    info!(path = %backend.path().display(), entries = restored, "archive restored");
    Ok(restored)
}
