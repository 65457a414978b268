// src/miner/restart.rs
//! Per-worker work-restart signal
//!
//! The coordinator raises a worker's flag after publishing new work; the
//! scanner polls it once per candidate. The worker clears it right before it
//! loads the published job, so a raise that lands after the load is never
//! lost and a stale raise at most costs one empty scan.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-flag restart signal owned by one worker, raised by anyone
#[derive(Debug, Default)]
pub struct WorkRestart {
    flag: AtomicBool,
}

impl WorkRestart {
    /// Creates a lowered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the owning worker to abandon its current scan
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Polled by the scanner after every tested candidate
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Lowers the flag, returning whether it had been raised
    pub fn clear(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}
