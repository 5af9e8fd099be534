//! Error type for record store operations.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A filesystem call (stat, read, write, mkdir, readlink, ...) failed.
    #[error("{op} {}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The advisory lock on a registry or the state file could not be taken.
    #[error("lock {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An argument file exists but does not decode.
    #[error("decode {}", path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// The download name is already bound to another fetcher.
    #[error("download {} is bound to fetcher {existing}, not {requested}", name.display())]
    BindingConflict {
        name: PathBuf,
        existing: String,
        requested: String,
    },

    /// One download name would contain the other.
    #[error("download {} overlaps existing record {}", name.display(), other.display())]
    NestedRecord { name: PathBuf, other: PathBuf },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },
}

impl StoreError {
    /// True for a missing fetcher/record, as opposed to a broken store.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound { .. } => true,
            StoreError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Build a `map_err` adapter that tags an I/O error with the operation and path.
pub(crate) fn io_err(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { op, path, source }
}
