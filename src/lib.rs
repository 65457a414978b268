//! powscan - multi-algorithm CPU proof-of-work nonce scanner
//!
//! This crate provides the search core of a CPU miner:
//! - A registry of proof-of-work algorithms (scrypt family, SHA-256d, Keccak,
//!   Skein, Groestl variants, AxiomHash)
//! - Per-thread hash contexts with explicit init/free lifecycle
//! - A nonce scanner with a two-tier target test and cooperative restart
//! - A scheduler that partitions the nonce space across worker threads
//! - Performance benchmarking and hardware monitoring

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Scanning core including algorithms, scanner and scheduling
pub mod miner;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::algorithm::registry;
pub use miner::job::JobFile;
pub use miner::{Algorithm, AlgorithmParams, HashContext, Job, Scheduler, Share, WorkItem, WorkRestart, Worker};
pub use miner::{MaskTable, ScanOutcome, ScanResult, TargetTester};
pub use stats::{HardwareStats, MiningStats, ShareResult, StatsReporter};
pub use types::{Hash256, Target};
pub use utils::{MinerError, init_logging};
