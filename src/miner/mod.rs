// src/miner/mod.rs
//! Core scanning functionality
//!
//! This module contains all components related to the proof-of-work search:
//! - Algorithm registry and hash contexts
//! - Two-tier target testing
//! - The nonce scanner and its restart signal
//! - Job scheduling and worker thread management

/// Proof-of-work algorithm implementations
///
/// Contains the [`Algorithm`] and [`algorithm::HashContext`] traits, the
/// registry, and every concrete algorithm.
pub mod algorithm;

/// Per-thread hash context lifecycle
pub mod context;

/// Jobs, job files and work items
pub mod job;

/// Per-worker work-restart signal
pub mod restart;

/// The nonce scanning loop
pub mod scanner;

/// Job scheduler
///
/// Handles distribution of jobs to workers and collection of shares.
/// Manages the current job and nonce-space partitioning.
pub mod scheduler;

/// Cheap filter and exact target test
pub mod target;

/// Worker thread implementation
///
/// Contains the worker thread logic that drives the scanner. Workers pick
/// up jobs from the scheduler and submit found shares.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::algorithm::{Algorithm, AlgorithmParams, HashContext};
pub use self::context::{ContextState, ThreadContext};
pub use self::job::{Job, WorkItem};
pub use self::restart::WorkRestart;
pub use self::scanner::{ScanOutcome, ScanResult, scan};
pub use self::scheduler::{Scheduler, Share, WorkerFault};
pub use self::target::{MaskTable, TargetTester};
pub use self::worker::Worker;
