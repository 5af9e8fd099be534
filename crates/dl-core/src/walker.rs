//! Concurrent recursive directory walk with fan-in error reporting.
//!
//! Every directory is visited by its own task ("branch"). A branch runs the
//! per-directory action, then spawns one branch per visible subdirectory
//! and waits for all of them before it finishes. All branches report into
//! one bounded channel; the channel closes when the last branch drops its
//! sender, i.e. once the whole tree is done. A panicking branch is reported
//! by whoever joins it; the root branch is joined by a small supervisor task.
//! Sending blocks while the channel is full, so the consumer must keep
//! draining.

use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const RESULT_CHANNEL_CAPACITY: usize = 16;

/// What a branch does after its own action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescentPolicy {
    /// Report the error and leave the subtree alone.
    StopOnError,
    /// Report the error and keep walking below the directory.
    ContinueOnError,
}

/// Unordered stream of errors from every branch of one walk.
#[derive(Debug)]
pub struct WalkErrors {
    rx: mpsc::Receiver<anyhow::Error>,
}

impl WalkErrors {
    /// Next error, or `None` once the entire tree has been walked.
    pub async fn next(&mut self) -> Option<anyhow::Error> {
        self.rx.recv().await
    }

    /// Drain the walk and keep one representative error.
    ///
    /// Which error is kept is arbitrary; the others are only logged.
    pub async fn first(mut self) -> Option<anyhow::Error> {
        let mut first = None;
        let mut dropped = 0usize;
        while let Some(err) = self.rx.recv().await {
            if first.is_none() {
                first = Some(err);
            } else {
                tracing::debug!("additional error: {:#}", err);
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "walk reported more than one error");
        }
        first
    }

    /// Drain the walk and return every error.
    pub async fn collect(mut self) -> Vec<anyhow::Error> {
        let mut all = Vec::new();
        while let Some(err) = self.rx.recv().await {
            all.push(err);
        }
        all
    }
}

struct Walk<F> {
    policy: DescentPolicy,
    action: F,
}

type Branch = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Start walking `root`, calling `action` once per directory.
///
/// Hidden directories (leading `.`) and symlinks are not entered. Errors are
/// prefixed with the directory they belong to. Must be called from within a
/// tokio runtime.
pub fn walk<F, Fut>(policy: DescentPolicy, root: impl Into<PathBuf>, action: F) -> WalkErrors
where
    F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
    let walk = Arc::new(Walk { policy, action });
    let root = root.into();
    let root_branch = tokio::spawn(visit(walk, root.clone(), tx.clone()));
    tokio::spawn(async move {
        if let Err(e) = root_branch.await {
            let _ = tx
                .send(anyhow::anyhow!("{}: walker branch failed: {}", root.display(), e))
                .await;
        }
    });
    WalkErrors { rx }
}

fn visit<F, Fut>(walk: Arc<Walk<F>>, dir: PathBuf, tx: mpsc::Sender<anyhow::Error>) -> Branch
where
    F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::pin(async move {
        tracing::trace!(dir = %dir.display(), "visit");
        let acted = (walk.action)(dir.clone())
            .await
            .map_err(|e| e.context(dir.display().to_string()));

        let deferred = match acted {
            Ok(()) => None,
            Err(e) if walk.policy == DescentPolicy::StopOnError => {
                tracing::debug!(dir = %dir.display(), "not descending: {:#}", e);
                let _ = tx.send(e).await;
                return;
            }
            Err(e) => Some(e),
        };

        let children = match list_subdirs(&dir).await {
            Ok(children) => children,
            Err(e) => {
                let listing = e.context(format!("{}: read dir", dir.display()));
                for err in deferred.into_iter().chain(Some(listing)) {
                    let _ = tx.send(err).await;
                }
                return;
            }
        };

        let mut branches = JoinSet::new();
        for child in children {
            branches.spawn(visit(Arc::clone(&walk), child, tx.clone()));
        }
        if let Some(e) = deferred {
            let _ = tx.send(e).await;
        }
        while let Some(joined) = branches.join_next().await {
            if let Err(e) = joined {
                let _ = tx
                    .send(anyhow::anyhow!("{}: walker branch failed: {}", dir.display(), e))
                    .await;
            }
        }
    })
}

async fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type().await?.is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for d in dirs {
            fs::create_dir_all(root.join(d)).unwrap();
        }
    }

    /// Records every visited directory relative to `root`; fails on names
    /// listed in `failing`.
    fn recorder(
        root: &Path,
        failing: &'static [&'static str],
    ) -> (
        Arc<Mutex<Vec<String>>>,
        impl Fn(PathBuf) -> ActionFuture + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let root = root.to_path_buf();
        let log = Arc::clone(&seen);
        let action = move |dir: PathBuf| {
            let rel = dir
                .strip_prefix(&root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            log.lock().unwrap().push(rel.clone());
            let fut: ActionFuture = Box::pin(async move {
                if failing.contains(&rel.as_str()) {
                    anyhow::bail!("boom");
                }
                Ok(())
            });
            fut
        };
        (seen, action)
    }

    fn sorted(seen: &Mutex<Vec<String>>) -> Vec<String> {
        let mut v = seen.lock().unwrap().clone();
        v.sort();
        v
    }

    #[tokio::test]
    async fn visits_every_visible_directory() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["a/b", "a/c/d", "e", ".hidden/x"]);
        fs::write(tmp.path().join("a/file.txt"), b"not a dir").unwrap();

        let (seen, action) = recorder(tmp.path(), &[]);
        let errors = walk(DescentPolicy::StopOnError, tmp.path(), action)
            .collect()
            .await;

        assert!(errors.is_empty());
        assert_eq!(sorted(&seen), vec!["", "a", "a/b", "a/c", "a/c/d", "e"]);
    }

    #[tokio::test]
    async fn stop_on_error_prunes_only_the_failing_subtree() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["a/c/d", "a/b/x"]);

        let (seen, action) = recorder(tmp.path(), &["a/c"]);
        let errors = walk(DescentPolicy::StopOnError, tmp.path(), action)
            .collect()
            .await;

        assert_eq!(errors.len(), 1);
        let msg = format!("{:#}", errors[0]);
        assert!(msg.contains("a/c"), "{msg}");
        assert!(msg.ends_with("boom"), "{msg}");
        assert_eq!(sorted(&seen), vec!["", "a", "a/b", "a/b/x", "a/c"]);
    }

    #[tokio::test]
    async fn continue_on_error_descends_and_reports_each_failure() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["a/c/d", "b"]);

        let (seen, action) = recorder(tmp.path(), &["a", "a/c/d", "b"]);
        let errors = walk(DescentPolicy::ContinueOnError, tmp.path(), action)
            .collect()
            .await;

        assert_eq!(errors.len(), 3);
        assert_eq!(sorted(&seen), vec!["", "a", "a/c", "a/c/d", "b"]);
    }

    #[tokio::test]
    async fn unreadable_root_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");

        let (seen, action) = recorder(tmp.path(), &[]);
        let first = walk(DescentPolicy::ContinueOnError, &missing, action)
            .first()
            .await
            .expect("read dir error");

        assert!(format!("{:#}", first).contains("read dir"));
        assert_eq!(sorted(&seen), vec!["missing"]);
    }

    #[tokio::test]
    async fn first_keeps_one_error_and_drains_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["a", "b", "c"]);

        let (_seen, action) = recorder(tmp.path(), &["a", "b", "c"]);
        let first = walk(DescentPolicy::ContinueOnError, tmp.path(), action)
            .first()
            .await;
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn panicking_action_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        mkdirs(tmp.path(), &["child"]);
        let root = tmp.path().to_path_buf();

        let action = move |dir: PathBuf| {
            let at_root = dir == root;
            async move {
                if at_root {
                    panic!("action blew up");
                }
                Ok::<(), anyhow::Error>(())
            }
        };
        let errors = walk(DescentPolicy::ContinueOnError, tmp.path(), action)
            .collect()
            .await;

        assert_eq!(errors.len(), 1);
        assert!(format!("{:#}", errors[0]).contains("walker branch failed"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn many_errors_do_not_deadlock_a_draining_consumer() {
        let tmp = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..64).map(|i| format!("d{i}")).collect();
        for n in &names {
            fs::create_dir(tmp.path().join(n)).unwrap();
        }

        let action = |_dir: PathBuf| async { Err::<(), _>(anyhow::anyhow!("fail")) };
        let errors = walk(DescentPolicy::ContinueOnError, tmp.path(), action)
            .collect()
            .await;
        assert_eq!(errors.len(), 65);
    }
}
