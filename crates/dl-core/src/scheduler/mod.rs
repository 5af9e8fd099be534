//! Process execution budget shared by every task of one operation.

mod tokens;

pub use tokens::{JobToken, JobTokenPool};

/// Job budget used when neither `-j` nor the config sets one.
pub fn default_job_budget() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Resolve the job budget: command-line flag, then config, then CPU count.
pub fn resolve_job_budget(flag: Option<usize>, configured: Option<usize>) -> usize {
    flag.or(configured)
        .unwrap_or_else(default_job_budget)
        .max(1)
}
