//! Records kept in a project's store.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use super::error::StoreError;

/// A named, reusable command prefix (program and base arguments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetcher {
    pub name: String,
    pub arguments: Vec<OsString>,
}

/// A pending fetch job: output path, bound fetcher and extra arguments.
///
/// `name` is relative to the project directory and doubles as the record's
/// key inside the download registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub name: PathBuf,
    pub fetcher: Fetcher,
    pub arguments: Vec<OsString>,
}

impl Download {
    /// Full command vector: the fetcher's arguments followed by the download's.
    pub fn command(&self) -> Vec<OsString> {
        self.fetcher
            .arguments
            .iter()
            .chain(self.arguments.iter())
            .cloned()
            .collect()
    }
}

/// Fetcher names are single path components other than `.` and `..`.
pub(crate) fn validate_fetcher_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(StoreError::InvalidName {
            kind: "fetcher",
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Download names are non-empty relative paths of plain components.
pub(crate) fn validate_download_name(name: &Path) -> Result<(), StoreError> {
    let mut components = name.components().peekable();
    let plain = components.peek().is_some()
        && components.all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(StoreError::InvalidName {
            kind: "download",
            name: name.display().to_string(),
        });
    }
    Ok(())
}
