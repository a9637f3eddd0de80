//! Cooperative cancellation for in-flight shield fetches.
//!
//! Each metadata query and thumbnail download gets a `CancellationToken`. The
//! resolver cancels a token when newer work supersedes it; the curl progress
//! callback and the pipeline between stages check the token and stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Work already past its last check still finishes,
    /// but its result is discarded.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// True if both handles share one flag (i.e. belong to the same fetch).
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }
}
