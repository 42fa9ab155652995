//! # Process lifecycle
//!
//! Every worker thread in the exec runs an unbounded loop whose condition is
//! the process-wide run flag held here. The flag starts true, is cleared
//! exactly once at shutdown, and is never reset.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle on the process-wide run state.
///
/// Handles are cheap to clone and one is passed to every worker thread, which
/// uses `running()` as its loop condition.
#[derive(Clone)]
pub struct Lifecycle {
    running: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Lifecycle {
    /// Create a new lifecycle handle in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// True while the process should keep executing.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Request shutdown of all worker loops.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shutdown_visible_to_clones() {
        let lc = Lifecycle::new();
        let worker_handle = lc.clone();

        assert!(worker_handle.running());

        lc.shutdown();

        assert!(!worker_handle.running());
    }
}
