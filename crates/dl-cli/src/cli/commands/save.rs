//! `dl save <args...>` – overwrite the arguments the `.dl` script receives.

use anyhow::Result;
use dl_core::store::RecordStore;
use std::ffi::OsString;
use std::path::Path;

pub fn run_save(dir: &Path, args: &[OsString]) -> Result<()> {
    RecordStore::open(dir)?.set_state(args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_replaces_state() {
        let dir = tempfile::tempdir().unwrap();
        run_save(dir.path(), &["a".into(), "b".into()]).unwrap();
        run_save(dir.path(), &["c".into()]).unwrap();
        let state = RecordStore::open(dir.path()).unwrap().get_state().unwrap();
        assert_eq!(state, vec![OsString::from("c")]);
    }
}
