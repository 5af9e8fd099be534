//! The two tree-wide operations and the process runner they share.

mod fetch;
mod parse;
mod process;

pub use fetch::run_fetch;
pub use parse::run_parse;
pub use process::ProcessError;

use anyhow::Result;
use std::path::Path;

/// `parse`, then `fetch` over the same tree; `fetch` only runs if every
/// marker script succeeded.
pub async fn run_all(root: &Path, jobs: usize) -> Result<()> {
    run_parse(root, jobs).await?;
    run_fetch(root, jobs).await
}
