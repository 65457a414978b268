// src/miner/context.rs
//! Per-thread hash context lifecycle
//!
//! A worker owns exactly one [`ThreadContext`]. It starts uninitialized,
//! becomes ready once the algorithm's scratch memory is allocated, and is
//! destroyed when the worker exits. Scanning is only possible while ready.

use crate::miner::algorithm::{Algorithm, AlgorithmParams, HashContext};
use crate::miner::job::{Job, WorkItem};
use crate::miner::restart::WorkRestart;
use crate::miner::scanner::ScanResult;
use crate::utils::error::MinerError;
use std::sync::Arc;

/// Lifecycle state of a thread context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No scratch memory yet
    Uninitialized,
    /// Scratch allocated, scans allowed
    Ready,
    /// Scratch released; terminal
    Destroyed,
}

/// The hash context of one worker thread plus its lifecycle state
pub struct ThreadContext {
    thr_id: usize,
    algorithm: Arc<dyn Algorithm>,
    inner: Option<Box<dyn HashContext>>,
    state: ContextState,
}

impl ThreadContext {
    /// Creates an uninitialized context for `algorithm`
    pub fn new(thr_id: usize, algorithm: Arc<dyn Algorithm>) -> Self {
        ThreadContext {
            thr_id,
            algorithm,
            inner: None,
            state: ContextState::Uninitialized,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Algorithm this context hashes with
    pub fn algorithm(&self) -> &Arc<dyn Algorithm> {
        &self.algorithm
    }

    /// Allocates the algorithm's scratch memory
    ///
    /// Must be called exactly once, on the thread that will scan. On failure
    /// the context stays uninitialized and the worker should not scan.
    pub fn init(&mut self, params: &AlgorithmParams) -> Result<(), MinerError> {
        if self.state != ContextState::Uninitialized {
            return Err(MinerError::ConfigError(format!(
                "[{}] context initialized twice (state {:?})",
                self.thr_id, self.state
            )));
        }

        let inner = self.algorithm.init_context(params)?;
        log::debug!(
            "[{}] {} context ready ({} KiB scratch)",
            self.thr_id,
            self.algorithm.name(),
            inner.scratch_bytes() / 1024
        );
        self.inner = Some(inner);
        self.state = ContextState::Ready;
        Ok(())
    }

    /// Mutable access to the underlying context while ready
    pub fn get_mut(&mut self) -> Option<&mut (dyn HashContext + 'static)> {
        self.inner.as_deref_mut()
    }

    fn ready(&mut self) -> Result<&mut (dyn HashContext + 'static), MinerError> {
        let state = self.state;
        let thr_id = self.thr_id;
        self.inner.as_deref_mut().ok_or_else(|| {
            MinerError::ConfigError(format!("[{}] context not ready (state {:?})", thr_id, state))
        })
    }

    /// Lets the context adapt its cost parameters to a new job
    pub fn prepare_work(&mut self, job: &Job) -> Result<(), MinerError> {
        self.ready()?.prepare_work(job)
    }

    /// Scans a work item with this thread's context
    pub fn scan(&mut self, work: &WorkItem, restart: &WorkRestart) -> Result<ScanResult, MinerError> {
        let thr_id = self.thr_id;
        let algorithm = self.algorithm.clone();
        let ctx = self.ready()?;
        Ok(algorithm.scan(thr_id, work, ctx, restart))
    }

    /// Releases the scratch memory; later calls are no-ops
    pub fn destroy(&mut self) {
        if self.state == ContextState::Ready {
            self.inner = None;
            log::debug!("[{}] {} context released", self.thr_id, self.algorithm.name());
        }
        self.state = ContextState::Destroyed;
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        self.destroy();
    }
}
