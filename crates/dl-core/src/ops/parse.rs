//! `parse`: run every project's marker script with its saved state.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::scheduler::JobTokenPool;
use crate::store::{RecordStore, MARKER_SCRIPT};
use crate::walker::{walk, DescentPolicy};

use super::process;

/// Walk `root` and run `.dl` in every directory that has one, at most `jobs`
/// at a time. A failing script stops the walk below its directory only.
pub async fn run_parse(root: &Path, jobs: usize) -> Result<()> {
    let pool = Arc::new(JobTokenPool::new(jobs));
    tracing::info!(root = %root.display(), jobs = pool.capacity(), "parse");

    let tokens = Arc::clone(&pool);
    let errors = walk(DescentPolicy::StopOnError, root, move |dir| {
        parse_project(dir, Arc::clone(&tokens))
    });
    pool.open();

    match errors.first().await {
        Some(err) => Err(err.context("parse")),
        None => Ok(()),
    }
}

async fn parse_project(dir: PathBuf, pool: Arc<JobTokenPool>) -> Result<()> {
    let script = dir.join(MARKER_SCRIPT);
    match tokio::fs::symlink_metadata(&script).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("stat {}", script.display())),
    }
    let program = std::path::absolute(&script)
        .with_context(|| format!("resolve {}", script.display()))?;

    let project = dir.clone();
    let state = tokio::task::spawn_blocking(move || {
        RecordStore::open(&project).and_then(|store| store.get_state())
    })
    .await
    .context("state task join")?
    .context("read state")?;

    let _token = pool.acquire().await?;
    println!("~~ {}", dir.display());
    tracing::debug!(dir = %dir.display(), args = state.len(), "run marker script");

    let mut cmd = Command::new(&program);
    cmd.args(&state)
        .current_dir(&dir)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    process::run(cmd).await?;
    Ok(())
}
