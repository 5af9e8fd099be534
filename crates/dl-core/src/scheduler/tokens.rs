//! Job tokens: a fixed number of permits, one per running external process.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool of interchangeable job tokens.
///
/// The pool starts closed (no permits). [`open`](Self::open) injects the
/// full capacity once, after the work that consumes tokens has been
/// launched. Only process execution is bounded; directory traversal never
/// takes a token.
#[derive(Debug)]
pub struct JobTokenPool {
    capacity: usize,
    permits: Arc<Semaphore>,
    opened: AtomicBool,
}

/// Held while one external process runs; returns its permit when dropped.
#[derive(Debug)]
pub struct JobToken {
    _permit: OwnedSemaphorePermit,
}

impl JobTokenPool {
    /// Create a closed pool with `capacity` tokens (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            permits: Arc::new(Semaphore::new(0)),
            opened: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Make all tokens available. Later calls are no-ops.
    pub fn open(&self) {
        if !self.opened.swap(true, Ordering::AcqRel) {
            self.permits.add_permits(self.capacity);
            tracing::debug!(capacity = self.capacity, "job token pool opened");
        }
    }

    /// Number of tokens currently held.
    pub fn in_use(&self) -> usize {
        if self.opened.load(Ordering::Acquire) {
            self.capacity
                .saturating_sub(self.permits.available_permits())
        } else {
            0
        }
    }

    /// Wait for a token. Pending until the pool is opened.
    pub async fn acquire(&self) -> Result<JobToken> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("job token pool closed")?;
        Ok(JobToken { _permit: permit })
    }
}
