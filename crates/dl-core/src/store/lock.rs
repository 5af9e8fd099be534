//! RAII advisory locks (`flock(2)` via `fs2`) on store resources.
//!
//! Registries are locked through their directory; the state slot is locked
//! through the state file itself, created empty if missing.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockMode {
    Shared,
    Exclusive,
}

/// Holds a lock until dropped.
pub(crate) struct ResourceLock {
    file: File,
    path: PathBuf,
}

impl ResourceLock {
    /// Lock a registry directory.
    pub(crate) fn dir(path: &Path, mode: LockMode) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        Self::acquire(file, path, mode)
    }

    /// Lock a plain file, creating it (empty) when absent.
    pub(crate) fn file(path: &Path, mode: LockMode) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| StoreError::Lock {
                path: path.to_path_buf(),
                source,
            })?;
        Self::acquire(file, path, mode)
    }

    fn acquire(file: File, path: &Path, mode: LockMode) -> Result<Self, StoreError> {
        let locked = match mode {
            LockMode::Shared => file.lock_shared(),
            LockMode::Exclusive => file.lock_exclusive(),
        };
        locked.map_err(|source| StoreError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::trace!(path = %path.display(), ?mode, "lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), "unlock: {}", e);
        }
    }
}
