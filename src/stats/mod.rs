//! Hashrate and share accounting
//!
//! Workers send per-scan hash counts and the share consumer sends verdicts
//! over channels from [`StatsReporter`]; the reporter folds them into atomic
//! totals and optionally logs a summary line with host load on an interval.

/// [`StatsReporter`] and the snapshots it produces
pub mod reporter;

pub use reporter::{HardwareStats, MiningStats, ShareResult, StatsReporter};
