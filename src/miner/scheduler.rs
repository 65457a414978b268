// src/miner/scheduler.rs
//! Mining job scheduler implementation
//!
//! Manages the distribution of jobs to workers and collection of shares.
//! Handles job updates, nonce-space partitioning, and worker lifecycle.
//!
//! A job update stores the new job together with a bumped generation
//! number, then raises every worker's restart signal. Workers clear their
//! signal before reading the published job, so no update is ever missed.

use crate::miner::algorithm::{Algorithm, AlgorithmParams};
use crate::miner::job::Job;
use crate::miner::restart::WorkRestart;
use crate::miner::target::MaskTable;
use crate::miner::worker::{Worker, WorkerShared};
use crate::types::{Hash256, NONCE_SPACE};
use crate::utils::error::MinerError;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;

/// Job as seen by workers, tagged with its publication number
#[derive(Debug, Default)]
pub struct Published {
    /// Incremented on every update; 0 means nothing published yet
    pub generation: u64,
    /// Current job, if any
    pub job: Option<Arc<Job>>,
}

/// Represents a share found by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    /// Job ID this share belongs to
    pub job_id: String,
    /// Worker that found it
    pub thr_id: usize,
    /// Nonce that produced the hash
    pub nonce: u32,
    /// Resulting hash that meets the target
    pub hash: Hash256,
}

/// Error that ended a worker after its context was ready
#[derive(Debug)]
pub struct WorkerFault {
    /// Worker that stopped
    pub thr_id: usize,
    /// What stopped it, e.g. a scratch resize in `prepare_work`
    pub error: MinerError,
}

/// Nonce slice for worker `index` of `workers`
///
/// Slices are contiguous and disjoint; the last one absorbs the remainder.
pub fn nonce_slice(index: usize, workers: usize) -> Range<u64> {
    let workers = workers.max(1) as u64;
    let index = index as u64;
    let span = NONCE_SPACE / workers;
    let start = index * span;
    let end = if index + 1 >= workers { NONCE_SPACE } else { start + span };
    start..end
}

/// Coordinates jobs across worker threads
pub struct Scheduler {
    /// Current job (atomically swappable)
    published: Arc<ArcSwap<Published>>,
    /// One restart signal per spawned worker
    restarts: Vec<Arc<WorkRestart>>,
    /// Channel for sending found shares
    share_sender: Sender<Share>,
    /// Optional channel for per-scan hash counts
    hash_sender: Option<Sender<u64>>,
    /// Flag to control worker threads
    active: Arc<AtomicBool>,
    /// Workers done with their slice of the current job
    idle: Arc<AtomicUsize>,
    /// Workers still running
    live: Arc<AtomicUsize>,
    /// Workers that died on an error after starting
    failed: Arc<AtomicUsize>,
    fault_sender: Sender<WorkerFault>,
    fault_receiver: Receiver<WorkerFault>,
    /// First fault drained from the channel, kept until reported
    first_fault: Option<WorkerFault>,
    /// Number of nonces per scan call
    scan_chunk: u64,
    /// Filter table used by every worker
    mask_table: Arc<MaskTable>,
    /// Cost parameters for context initialization
    params: AlgorithmParams,
    /// Worker thread handles
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Creates a new Scheduler instance
    ///
    /// # Arguments
    /// * `share_sender` - Channel for found shares
    /// * `scan_chunk` - Number of nonces each scan call covers
    pub fn new(share_sender: Sender<Share>, scan_chunk: u64) -> Self {
        let (fault_sender, fault_receiver) = crossbeam_channel::unbounded();
        Scheduler {
            published: Arc::new(ArcSwap::from_pointee(Published::default())),
            restarts: Vec::new(),
            share_sender,
            hash_sender: None,
            active: Arc::new(AtomicBool::new(true)),
            idle: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            fault_sender,
            fault_receiver,
            first_fault: None,
            scan_chunk: scan_chunk.max(1),
            mask_table: Arc::new(MaskTable::default()),
            params: AlgorithmParams::default(),
            handles: Vec::new(),
        }
    }

    /// Uses a custom filter table
    pub fn with_mask_table(mut self, table: MaskTable) -> Self {
        self.mask_table = Arc::new(table);
        self
    }

    /// Uses custom cost parameters
    pub fn with_params(mut self, params: AlgorithmParams) -> Self {
        self.params = params;
        self
    }

    /// Reports hash counts after every scan call
    pub fn with_hash_sender(mut self, sender: Sender<u64>) -> Self {
        self.hash_sender = Some(sender);
        self
    }

    /// Spawns `workers` threads and waits for their contexts
    ///
    /// Each thread allocates its own context before reporting back. A
    /// worker whose context fails exits immediately; the others keep going.
    ///
    /// # Arguments
    /// * `algorithm` - The algorithm to use
    /// * `workers` - Number of worker threads to spawn
    ///
    /// # Returns
    /// Number of workers that are ready, or `NoUsableWorkers` if none are
    pub fn start_mining(&mut self, algorithm: Arc<dyn Algorithm>, workers: usize) -> Result<usize, MinerError> {
        let workers = workers.max(1);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(workers);
        self.active.store(true, Ordering::SeqCst);

        let shared = WorkerShared {
            published: self.published.clone(),
            active: self.active.clone(),
            idle: self.idle.clone(),
            live: self.live.clone(),
            failed: self.failed.clone(),
            fault_sender: self.fault_sender.clone(),
            share_sender: self.share_sender.clone(),
            hash_sender: self.hash_sender.clone(),
            mask_table: self.mask_table.clone(),
            scan_chunk: self.scan_chunk,
        };

        for thr_id in 0..workers {
            let restart = Arc::new(WorkRestart::new());
            self.restarts.push(restart.clone());
            let mut worker = Worker::new(thr_id, algorithm.clone(), restart, nonce_slice(thr_id, workers), shared.clone());
            let params = self.params;
            let ready_tx = ready_tx.clone();
            let live = self.live.clone();
            live.fetch_add(1, Ordering::SeqCst);

            let spawned = std::thread::Builder::new()
                .name(format!("worker-{}", thr_id))
                .spawn(move || match worker.init(&params) {
                    Ok(()) => {
                        let _ = ready_tx.send((thr_id, Ok(())));
                        worker.run();
                    }
                    Err(e) => {
                        live.fetch_sub(1, Ordering::SeqCst);
                        let _ = ready_tx.send((thr_id, Err(e)));
                    }
                });
            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    self.live.fetch_sub(1, Ordering::SeqCst);
                    self.stop();
                    return Err(e.into());
                }
            }
        }
        drop(ready_tx);

        let mut ready = 0;
        for (thr_id, result) in ready_rx.iter().take(workers) {
            match result {
                Ok(()) => ready += 1,
                Err(e) => log::error!("[{}] hash context failed: {}", thr_id, e),
            }
        }

        if ready == 0 {
            self.stop();
            return Err(MinerError::NoUsableWorkers {
                algorithm: algorithm.name(),
                requested: workers,
            });
        }
        log::info!("{} of {} {} workers ready", ready, workers, algorithm.name());
        Ok(ready)
    }

    /// Publishes a new job and interrupts every worker
    ///
    /// # Arguments
    /// * `job` - The job to replace the current one
    pub fn update_job(&self, job: Job) {
        let generation = self.published.load().generation + 1;
        log::info!("New job {} (generation {}, target {})", job.job_id, generation, job.target);
        self.published.store(Arc::new(Published {
            generation,
            job: Some(Arc::new(job)),
        }));
        for restart in &self.restarts {
            restart.raise();
        }
    }

    /// Generation of the currently published job
    pub fn generation(&self) -> u64 {
        self.published.load().generation
    }

    /// Workers still running
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Workers that finished their slice of the current job
    pub fn idle_workers(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }

    /// Workers that stopped on an error after starting
    pub fn failed_workers(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// True once every running worker has exhausted its slice
    ///
    /// Never true after a worker died mid-run, since its slice was not
    /// finished; see [`Scheduler::is_stalled`].
    pub fn is_exhausted(&self) -> bool {
        let live = self.live_workers();
        live > 0 && self.failed_workers() == 0 && self.idle_workers() >= live
    }

    /// True when the surviving workers are all idle but some slices were
    /// abandoned by failed workers
    pub fn is_stalled(&self) -> bool {
        let live = self.live_workers();
        live > 0 && self.failed_workers() > 0 && self.idle_workers() >= live
    }

    /// Collects worker faults and fails once no worker is left running
    ///
    /// # Errors
    /// The first fault's error (an `AllocationError` names the algorithm
    /// and its parameters) when every started worker has died
    pub fn check_workers(&mut self) -> Result<(), MinerError> {
        // read `live` first; workers send their fault before decrementing it
        let live = self.live_workers();
        for fault in self.fault_receiver.try_iter() {
            log::error!("[{}] worker lost: {}", fault.thr_id, fault.error);
            if self.first_fault.is_none() {
                self.first_fault = Some(fault);
            }
        }
        if live > 0 || !self.active.load(Ordering::SeqCst) {
            return Ok(());
        }
        match self.first_fault.take() {
            Some(fault) => Err(fault.error),
            None => Ok(()),
        }
    }

    /// Stops all workers and waits for them to exit
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        for restart in &self.restarts {
            restart.raise();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
        self.restarts.clear();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_cover_the_nonce_space() {
        for workers in [1, 3, 4, 7] {
            let slices: Vec<_> = (0..workers).map(|i| nonce_slice(i, workers)).collect();
            assert_eq!(slices[0].start, 0);
            assert_eq!(slices[workers - 1].end, NONCE_SPACE);
            for pair in slices.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn update_bumps_generation_and_raises() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut scheduler = Scheduler::new(tx, 16);
        let restart = Arc::new(WorkRestart::new());
        scheduler.restarts.push(restart.clone());

        assert_eq!(scheduler.generation(), 0);
        scheduler.update_job(Job::new("a", [0; 20], crate::types::Target::ZERO));
        assert_eq!(scheduler.generation(), 1);
        assert!(restart.is_raised());
        scheduler.restarts.clear();
    }

    #[test]
    fn dead_workers_block_exhaustion() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let scheduler = Scheduler::new(tx, 16);
        assert!(!scheduler.is_exhausted());

        scheduler.live.store(2, Ordering::SeqCst);
        scheduler.idle.store(2, Ordering::SeqCst);
        assert!(scheduler.is_exhausted());
        assert!(!scheduler.is_stalled());

        scheduler.failed.store(1, Ordering::SeqCst);
        assert!(!scheduler.is_exhausted());
        assert!(scheduler.is_stalled());
        scheduler.live.store(0, Ordering::SeqCst);
        scheduler.idle.store(0, Ordering::SeqCst);
    }
}
