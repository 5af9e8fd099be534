//! Per-project record store kept under `.dldir/`.
//!
//! ```text
//! .dldir/fetchers/<name>                  encoded fetcher arguments
//! .dldir/downloads/<path...>/fetcher      symlink -> ../../fetchers/<name>
//! .dldir/downloads/<path...>/arguments    encoded download arguments
//! .dldir/state                            encoded marker script arguments
//! .dldir/tmp/                             scratch files, renamed into place
//! ```
//!
//! A [`RecordStore`] is a stateless handle on one project directory. Every
//! call takes its own advisory lock (shared to read, exclusive to write) on
//! the resource it touches and releases it before returning, so handles can
//! be created freely, also from concurrent `dl` processes.

mod downloads;
mod error;
mod lock;
mod types;

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use crate::codec;

pub use error::StoreError;
pub use types::{Download, Fetcher};

use error::io_err;
use lock::{LockMode, ResourceLock};
use types::validate_fetcher_name;

/// Executable run by `parse` in each project directory.
pub const MARKER_SCRIPT: &str = ".dl";
/// Registry root inside a project directory.
pub const REGISTRY_DIR: &str = ".dldir";

const FETCHERS_DIR: &str = "fetchers";
const DOWNLOADS_DIR: &str = "downloads";
const STATE_FILE: &str = "state";
const FETCHER_LINK: &str = "fetcher";
const ARGUMENTS_FILE: &str = "arguments";
const SCRATCH_DIR: &str = "tmp";

/// Handle to the record store of one project directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    project_dir: PathBuf,
}

impl RecordStore {
    /// Open the store of `project_dir`, creating the registry layout and an
    /// empty state file if needed. Idempotent.
    pub fn open(project_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = RecordStore {
            project_dir: project_dir.as_ref().to_path_buf(),
        };
        for dir in [
            store.registry_dir(),
            store.fetchers_dir(),
            store.downloads_dir(),
            store.scratch_dir(),
        ] {
            match fs::create_dir(&dir) {
                Ok(()) => tracing::debug!(dir = %dir.display(), "created registry directory"),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(io_err("mkdir", &dir)(e)),
            }
        }

        let state = store.state_path();
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&state)
            .map_err(io_err("create", &state))?;

        Ok(store)
    }

    /// True if `project_dir` holds a registry (without creating one).
    pub fn exists(project_dir: impl AsRef<Path>) -> bool {
        project_dir.as_ref().join(REGISTRY_DIR).is_dir()
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn registry_dir(&self) -> PathBuf {
        self.project_dir.join(REGISTRY_DIR)
    }

    fn fetchers_dir(&self) -> PathBuf {
        self.registry_dir().join(FETCHERS_DIR)
    }

    fn downloads_dir(&self) -> PathBuf {
        self.registry_dir().join(DOWNLOADS_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.registry_dir().join(STATE_FILE)
    }

    fn scratch_dir(&self) -> PathBuf {
        self.registry_dir().join(SCRATCH_DIR)
    }

    /// Read the fetcher called `name`.
    pub fn get_fetcher(&self, name: &str) -> Result<Fetcher, StoreError> {
        validate_fetcher_name(name)?;
        let dir = self.fetchers_dir();
        let _lock = ResourceLock::dir(&dir, LockMode::Shared)?;

        let path = dir.join(name);
        let arguments = match read_arguments(&path) {
            Err(e) if e.is_not_found() => {
                return Err(StoreError::NotFound {
                    kind: "fetcher",
                    name: name.to_string(),
                })
            }
            other => other?,
        };
        Ok(Fetcher {
            name: name.to_string(),
            arguments,
        })
    }

    /// Create or replace a fetcher as a whole.
    pub fn add_fetcher(&self, fetcher: &Fetcher) -> Result<(), StoreError> {
        validate_fetcher_name(&fetcher.name)?;
        let dir = self.fetchers_dir();
        let _lock = ResourceLock::dir(&dir, LockMode::Exclusive)?;

        self.write_arguments_atomic(&dir.join(&fetcher.name), &fetcher.arguments)?;
        tracing::debug!(fetcher = %fetcher.name, "fetcher saved");
        Ok(())
    }

    /// Arguments passed to the marker script; empty until first `set_state`.
    pub fn get_state(&self) -> Result<Vec<OsString>, StoreError> {
        let path = self.state_path();
        let _lock = ResourceLock::file(&path, LockMode::Shared)?;
        read_arguments(&path)
    }

    /// Replace the marker script arguments.
    ///
    /// The lock is held on the file being replaced. A writer that queued on
    /// an inode already renamed away still publishes a whole encoding; the
    /// last rename wins.
    pub fn set_state(&self, args: &[OsString]) -> Result<(), StoreError> {
        let path = self.state_path();
        let _lock = ResourceLock::file(&path, LockMode::Exclusive)?;
        self.write_arguments_atomic(&path, args)
    }

    /// Write to a scratch file under `tmp/`, then rename over `path`, so
    /// readers see either the old or the new encoding and never a torn one.
    /// Scratch files never live next to records, so no record name can
    /// collide with one.
    fn write_arguments_atomic(&self, path: &Path, args: &[OsString]) -> Result<(), StoreError> {
        let scratch = self.scratch_dir();
        let mut file = tempfile::NamedTempFile::new_in(&scratch)
            .map_err(io_err("create scratch file in", &scratch))?;
        file.write_all(&encode_arguments(args)).map_err(io_err("write", file.path()))?;
        file.as_file().sync_data().map_err(io_err("sync", file.path()))?;
        file.persist(path).map_err(|e| io_err("rename", path)(e.error))?;
        Ok(())
    }
}

fn encode_arguments(args: &[OsString]) -> Vec<u8> {
    let raw: Vec<&[u8]> = args.iter().map(|a| a.as_bytes()).collect();
    codec::encode(&raw)
}

fn read_arguments(path: &Path) -> Result<Vec<OsString>, StoreError> {
    let raw = fs::read(path).map_err(io_err("read", path))?;
    let decoded = codec::decode(&raw).map_err(|source| StoreError::Codec {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.into_iter().map(OsString::from_vec).collect())
}
