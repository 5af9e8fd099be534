//! `fetch`: run every registered download and retire the ones that succeed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::scheduler::JobTokenPool;
use crate::store::{Download, RecordStore};
use crate::walker::{walk, DescentPolicy};

use super::process::{self, ProcessError};

/// Walk `root` and fetch every download of every project, at most `jobs`
/// commands at a time. Failures are isolated per download.
pub async fn run_fetch(root: &Path, jobs: usize) -> Result<()> {
    let pool = Arc::new(JobTokenPool::new(jobs));
    tracing::info!(root = %root.display(), jobs = pool.capacity(), "fetch");

    let tokens = Arc::clone(&pool);
    let errors = walk(DescentPolicy::ContinueOnError, root, move |dir| {
        fetch_project(dir, Arc::clone(&tokens))
    });
    pool.open();

    match errors.first().await {
        Some(err) => Err(err.context("fetch")),
        None => Ok(()),
    }
}

async fn fetch_project(dir: PathBuf, pool: Arc<JobTokenPool>) -> Result<()> {
    if !RecordStore::exists(&dir) {
        return Ok(());
    }

    let project = dir.clone();
    let (store, downloads) = tokio::task::spawn_blocking(move || {
        let store = RecordStore::open(&project)?;
        let downloads = store.get_downloads()?;
        Ok::<_, crate::store::StoreError>((store, downloads))
    })
    .await
    .context("registry task join")?
    .context("read downloads")?;

    if downloads.is_empty() {
        return Ok(());
    }
    let total = downloads.len();
    tracing::debug!(dir = %dir.display(), total, "dispatching downloads");

    let mut tasks = JoinSet::new();
    for download in downloads {
        let store = store.clone();
        let pool = Arc::clone(&pool);
        tasks.spawn(async move {
            let name = download.name.clone();
            fetch_one(store, download, pool)
                .await
                .with_context(|| name.display().to_string())
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.context("download task join").and_then(|r| r);
        if let Err(err) = outcome {
            tracing::warn!(dir = %dir.display(), "download failed: {:#}", err);
            failures.push(err);
        }
    }

    let failed = failures.len();
    match failures.into_iter().next() {
        None => Ok(()),
        Some(first) if failed == 1 => Err(first),
        Some(first) => Err(first.context(format!("{failed} of {total} downloads failed"))),
    }
}

/// Run one download with its stdout captured in the output file; delete the
/// record once the command exits cleanly.
async fn fetch_one(store: RecordStore, download: Download, pool: Arc<JobTokenPool>) -> Result<()> {
    let _token = pool.acquire().await?;
    println!(">> {}", download.name.display());

    let output = store.project_dir().join(&download.name);
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let file = tokio::fs::File::create(&output)
        .await
        .with_context(|| format!("create {}", output.display()))?;

    let command = download.command();
    let (program, args) = command.split_first().ok_or(ProcessError::EmptyCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(store.project_dir())
        .stdin(Stdio::null())
        .stdout(Stdio::from(file.into_std().await))
        .stderr(Stdio::inherit());
    process::run(cmd).await?;

    tokio::task::spawn_blocking(move || store.del_download(&download))
        .await
        .context("registry task join")?
        .context("remove finished download")?;
    Ok(())
}
