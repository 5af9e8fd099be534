//! Shared fixtures: project directories, records and marker scripts.

#![allow(dead_code)]

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use dl_core::store::{Download, Fetcher, RecordStore};

pub fn args(items: &[&str]) -> Vec<OsString> {
    items.iter().map(OsString::from).collect()
}

/// Create `root/rel` and return its path.
pub fn mkdir(root: &Path, rel: &str) -> PathBuf {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write an executable `.dl` into `dir`. The file is closed before returning.
pub fn marker_script(dir: &Path, body: &str) {
    let path = dir.join(dl_core::store::MARKER_SCRIPT);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Register `fetcher` in `dir`'s store and return the store.
pub fn store_with_fetcher(dir: &Path, fetcher: &Fetcher) -> RecordStore {
    let store = RecordStore::open(dir).unwrap();
    store.add_fetcher(fetcher).unwrap();
    store
}

pub fn fetcher(name: &str, items: &[&str]) -> Fetcher {
    Fetcher {
        name: name.to_string(),
        arguments: args(items),
    }
}

pub fn download(name: &str, fetcher: &Fetcher, items: &[&str]) -> Download {
    Download {
        name: PathBuf::from(name),
        fetcher: fetcher.clone(),
        arguments: args(items),
    }
}

pub fn sorted_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}
