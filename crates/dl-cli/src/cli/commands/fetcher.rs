//! `dl fetcher <name> <args...>` – register or replace a fetcher.

use anyhow::Result;
use dl_core::store::{Fetcher, RecordStore};
use std::ffi::OsString;
use std::path::Path;

pub fn run_fetcher(dir: &Path, name: &str, args: Vec<OsString>) -> Result<()> {
    let store = RecordStore::open(dir)?;
    store.add_fetcher(&Fetcher {
        name: name.to_string(),
        arguments: args,
    })?;
    Ok(())
}
