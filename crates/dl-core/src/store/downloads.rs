//! Download registry: nested record directories bound to fetchers by symlink.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::{io_err, StoreError};
use super::lock::{LockMode, ResourceLock};
use super::types::{validate_download_name, validate_fetcher_name, Download, Fetcher};
use super::{read_arguments, RecordStore, ARGUMENTS_FILE, FETCHERS_DIR, FETCHER_LINK};

impl RecordStore {
    /// Register `download`, binding its name to its fetcher.
    ///
    /// Re-adding a name with the same fetcher overwrites the arguments;
    /// re-adding it with a different fetcher fails with
    /// [`StoreError::BindingConflict`] and leaves the record untouched.
    /// A record can't sit inside another one: the output of one would have to
    /// be both a file and a directory.
    pub fn add_download(&self, download: &Download) -> Result<(), StoreError> {
        validate_download_name(&download.name)?;
        validate_fetcher_name(&download.fetcher.name)?;
        let root = self.downloads_dir();
        let _lock = ResourceLock::dir(&root, LockMode::Exclusive)?;
        check_not_nested(&root, &download.name)?;

        let dir = root.join(&download.name);
        fs::create_dir_all(&dir).map_err(io_err("mkdir", &dir))?;

        let link = dir.join(FETCHER_LINK);
        let target = fetcher_link_target(&download.name, &download.fetcher.name);
        match std::os::unix::fs::symlink(&target, &link) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let current = fs::read_link(&link).map_err(io_err("readlink", &link))?;
                if current != target {
                    return Err(StoreError::BindingConflict {
                        name: download.name.clone(),
                        existing: current
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        requested: download.fetcher.name.clone(),
                    });
                }
            }
            Err(e) => return Err(io_err("symlink", &link)(e)),
        }

        self.write_arguments_atomic(&dir.join(ARGUMENTS_FILE), &download.arguments)?;
        tracing::debug!(
            download = %download.name.display(),
            fetcher = %download.fetcher.name,
            "download registered"
        );
        Ok(())
    }

    /// All complete download records, with their fetchers resolved.
    ///
    /// Records left half-written by an interrupted `add_download` (only one
    /// of the link and argument file present) are skipped with a warning.
    pub fn get_downloads(&self) -> Result<Vec<Download>, StoreError> {
        let root = self.downloads_dir();
        let _lock = ResourceLock::dir(&root, LockMode::Shared)?;

        let mut fetchers = HashMap::new();
        let mut out = Vec::new();
        self.collect_downloads(&root, Path::new(""), &mut fetchers, &mut out)?;
        Ok(out)
    }

    fn collect_downloads(
        &self,
        root: &Path,
        prefix: &Path,
        fetchers: &mut HashMap<String, Fetcher>,
        out: &mut Vec<Download>,
    ) -> Result<(), StoreError> {
        let dir = root.join(prefix);
        let entries = fs::read_dir(&dir).map_err(io_err("read dir", &dir))?;
        for entry in entries {
            let entry = entry.map_err(io_err("read dir", &dir))?;
            let name = prefix.join(entry.file_name());
            let path = root.join(&name);

            let file_type = entry.file_type().map_err(io_err("stat", &path))?;
            if !file_type.is_dir() {
                return Err(io_err("read dir", &path)(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "neither a download record nor a directory",
                )));
            }

            let has_link = exists(&path.join(FETCHER_LINK))?;
            let has_args = exists(&path.join(ARGUMENTS_FILE))?;
            match (has_link, has_args) {
                (true, true) => out.push(self.read_download(&path, name, fetchers)?),
                (false, false) => self.collect_downloads(root, &name, fetchers, out)?,
                _ => tracing::warn!(
                    download = %name.display(),
                    "skipping incomplete download record; re-run `add` to repair"
                ),
            }
        }
        Ok(())
    }

    fn read_download(
        &self,
        dir: &Path,
        name: PathBuf,
        fetchers: &mut HashMap<String, Fetcher>,
    ) -> Result<Download, StoreError> {
        let link = dir.join(FETCHER_LINK);
        let target = fs::read_link(&link).map_err(io_err("readlink", &link))?;
        let fetcher_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidName {
                kind: "fetcher",
                name: target.display().to_string(),
            })?;

        let fetcher = match fetchers.get(fetcher_name) {
            Some(f) => f.clone(),
            None => {
                let f = self.get_fetcher(fetcher_name)?;
                fetchers.insert(f.name.clone(), f.clone());
                f
            }
        };
        let arguments = read_arguments(&dir.join(ARGUMENTS_FILE))?;

        Ok(Download {
            name,
            fetcher,
            arguments,
        })
    }

    /// Remove a download record. Missing pieces are not an error.
    pub fn del_download(&self, download: &Download) -> Result<(), StoreError> {
        validate_download_name(&download.name)?;
        let root = self.downloads_dir();
        let _lock = ResourceLock::dir(&root, LockMode::Exclusive)?;

        let dir = root.join(&download.name);
        for path in [dir.join(ARGUMENTS_FILE), dir.join(FETCHER_LINK)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err("remove", &path)(e)),
            }
        }

        match fs::remove_dir(&dir) {
            Ok(()) => prune_empty_parents(&root, &dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err("remove", &dir)(e)),
        }

        tracing::debug!(download = %download.name.display(), "download removed");
        Ok(())
    }
}

/// Relative link from `downloads/<name>/` to `fetchers/<fetcher>`: one `..`
/// per name component, one more to leave `downloads/`.
fn fetcher_link_target(name: &Path, fetcher: &str) -> PathBuf {
    let mut target = PathBuf::new();
    for _ in 0..=name.components().count() {
        target.push("..");
    }
    target.push(FETCHERS_DIR);
    target.push(fetcher);
    target
}

fn exists(path: &Path) -> Result<bool, StoreError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_err("stat", path)(e)),
    }
}

fn is_record(dir: &Path) -> Result<bool, StoreError> {
    Ok(exists(&dir.join(FETCHER_LINK))? || exists(&dir.join(ARGUMENTS_FILE))?)
}

/// Reject `name` if a record (even an incomplete one) exists above it, or if
/// its directory already holds something other than its own record.
fn check_not_nested(root: &Path, name: &Path) -> Result<(), StoreError> {
    let mut ancestor = PathBuf::new();
    if let Some(parent) = name.parent() {
        for component in parent.components() {
            ancestor.push(component);
            if is_record(&root.join(&ancestor))? {
                return Err(StoreError::NestedRecord {
                    name: name.to_path_buf(),
                    other: ancestor,
                });
            }
        }
    }

    let dir = root.join(name);
    if !dir.is_dir() || is_record(&dir)? {
        return Ok(());
    }
    let mut entries = fs::read_dir(&dir).map_err(io_err("read dir", &dir))?;
    match entries.next() {
        Some(entry) => {
            let entry = entry.map_err(io_err("read dir", &dir))?;
            Err(StoreError::NestedRecord {
                name: name.to_path_buf(),
                other: name.join(entry.file_name()),
            })
        }
        None => Ok(()),
    }
}

/// Remove directories emptied by a deletion, stopping below the registry root.
fn prune_empty_parents(root: &Path, removed: &Path) {
    let mut current = removed.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        if let Err(e) = fs::remove_dir(dir) {
            tracing::trace!(dir = %dir.display(), "stop pruning: {}", e);
            break;
        }
        current = dir.parent();
    }
}
