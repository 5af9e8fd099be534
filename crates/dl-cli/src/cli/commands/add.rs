//! `dl add -o <output> -f <fetcher> [args...]` – register a download.

use anyhow::Result;
use dl_core::store::{Download, RecordStore};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

pub fn run_add(dir: &Path, output: &Path, fetcher: &str, args: Vec<OsString>) -> Result<()> {
    println!("++ {}", output.display());

    let store = RecordStore::open(dir)?;
    let fetcher = store.get_fetcher(fetcher)?;
    let download = Download {
        name: strip_cur_dir(output),
        fetcher,
        arguments: args,
    };
    store.add_download(&download)?;
    Ok(())
}

/// `./a/b` names the same record as `a/b`.
fn strip_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
