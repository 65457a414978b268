// src/miner/worker.rs
//! Worker thread implementation
//!
//! A worker owns one hash context and one restart signal. It walks its
//! slice of the nonce space for the currently published job in
//! `scan_chunk`-sized scan calls, reporting hash counts and shares back to
//! the scheduler through channels.

use crate::miner::algorithm::{Algorithm, AlgorithmParams};
use crate::miner::context::ThreadContext;
use crate::miner::job::{Job, WorkItem};
use crate::miner::restart::WorkRestart;
use crate::miner::scanner::{ScanOutcome, ScanResult};
use crate::miner::scheduler::{Published, Share, WorkerFault};
use crate::miner::target::MaskTable;
use crate::utils::error::MinerError;
use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Pause between polls while there is nothing to scan
const IDLE_POLL: Duration = Duration::from_millis(20);

/// State shared between the scheduler and all of its workers
#[derive(Clone)]
pub struct WorkerShared {
    /// Currently published job and its generation
    pub published: Arc<ArcSwap<Published>>,
    /// Cleared to stop every worker
    pub active: Arc<AtomicBool>,
    /// Workers that finished their slice of the current job
    pub idle: Arc<AtomicUsize>,
    /// Workers whose thread is still running
    pub live: Arc<AtomicUsize>,
    /// Workers that stopped on an error after their context was ready
    pub failed: Arc<AtomicUsize>,
    /// The error that stopped each failed worker
    pub fault_sender: Sender<WorkerFault>,
    /// Found shares
    pub share_sender: Sender<Share>,
    /// Hash counts after every scan call
    pub hash_sender: Option<Sender<u64>>,
    /// Filter table for building testers
    pub mask_table: Arc<MaskTable>,
    /// Nonces per scan call
    pub scan_chunk: u64,
}

/// Worker thread that performs the scanning
///
/// Each worker is responsible for one slice of the nonce space and reports
/// every share it finds in that slice.
pub struct Worker {
    thr_id: usize,
    context: ThreadContext,
    restart: Arc<WorkRestart>,
    slice: Range<u64>,
    shared: WorkerShared,
    idle: bool,
}

impl Worker {
    /// Creates a new Worker instance
    ///
    /// # Arguments
    /// * `thr_id` - Worker index
    /// * `algorithm` - The algorithm to hash with
    /// * `restart` - This worker's restart signal
    /// * `slice` - Nonces this worker owns, within `[0, 2^32)`
    /// * `shared` - Channels and flags shared with the scheduler
    pub fn new(
        thr_id: usize,
        algorithm: Arc<dyn Algorithm>,
        restart: Arc<WorkRestart>,
        slice: Range<u64>,
        shared: WorkerShared,
    ) -> Self {
        Worker {
            thr_id,
            context: ThreadContext::new(thr_id, algorithm),
            restart,
            slice,
            shared,
            idle: false,
        }
    }

    /// Allocates the hash context; call on the worker's own thread
    pub fn init(&mut self, params: &AlgorithmParams) -> Result<(), MinerError> {
        self.context.init(params)
    }

    /// Nonce slice owned by this worker
    pub fn slice(&self) -> &Range<u64> {
        &self.slice
    }

    /// Runs one scan call over `[first, max)` of `job`
    ///
    /// Sends the hash count to the statistics channel, if any.
    pub fn scan_once(&mut self, job: &Arc<Job>, first: u32, max: u64) -> Result<ScanResult, MinerError> {
        let work = WorkItem::new(job.clone(), &self.shared.mask_table, first, max)?;
        let result = self.context.scan(&work, &self.restart)?;
        if let Some(sender) = &self.shared.hash_sender {
            let _ = sender.send(result.hashes_done);
        }
        Ok(result)
    }

    /// Main loop; returns when the scheduler stops or on a fatal error
    ///
    /// A fatal error is counted and sent to the scheduler before `live`
    /// drops, so a scheduler that sees no live workers also sees every fault.
    pub fn run(mut self) {
        if let Err(error) = self.mine() {
            log::error!("[{}] worker stopped: {}", self.thr_id, error);
            self.shared.failed.fetch_add(1, Ordering::SeqCst);
            let _ = self.shared.fault_sender.send(WorkerFault {
                thr_id: self.thr_id,
                error,
            });
        }
        self.set_idle(false);
        self.context.destroy();
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn set_idle(&mut self, idle: bool) {
        if idle != self.idle {
            self.idle = idle;
            if idle {
                self.shared.idle.fetch_add(1, Ordering::SeqCst);
            } else {
                self.shared.idle.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    fn mine(&mut self) -> Result<(), MinerError> {
        let mut generation = 0;
        let mut job: Option<Arc<Job>> = None;
        let mut cursor = self.slice.start;

        while self.shared.active.load(Ordering::Acquire) {
            // clear before loading so a raise for a newer job is never lost
            self.restart.clear();
            let published = self.shared.published.load_full();

            if published.generation != generation {
                generation = published.generation;
                cursor = self.slice.start;
                self.set_idle(false);
                job = published.job.clone();
                if let Some(job) = &job {
                    self.context.prepare_work(job)?;
                    log::debug!("[{}] switched to job {}", self.thr_id, job.job_id);
                }
            }

            let Some(current) = job.clone() else {
                std::thread::sleep(IDLE_POLL);
                continue;
            };

            if cursor >= self.slice.end {
                if !self.idle {
                    log::debug!("[{}] slice exhausted for job {}", self.thr_id, current.job_id);
                    self.set_idle(true);
                }
                std::thread::sleep(IDLE_POLL);
                continue;
            }

            let max = (cursor + self.shared.scan_chunk).min(self.slice.end);
            let result = self.scan_once(&current, cursor as u32, max)?;

            match result.outcome {
                ScanOutcome::Found { nonce, hash } => {
                    log::debug!("[{}] share at nonce {:#010x} for job {}", self.thr_id, nonce, current.job_id);
                    self.shared.share_sender.send(Share {
                        job_id: current.job_id.clone(),
                        thr_id: self.thr_id,
                        nonce,
                        hash,
                    })?;
                    cursor = u64::from(nonce) + 1;
                }
                ScanOutcome::Exhausted => cursor = max,
                ScanOutcome::Cancelled => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::algorithm::registry;
    use crate::types::Target;
    use crossbeam_channel::{Receiver, unbounded};
    use std::time::Instant;

    fn shared(job: Option<Job>) -> (WorkerShared, Receiver<Share>, Receiver<u64>) {
        let (share_tx, share_rx) = unbounded();
        let (fault_tx, _) = unbounded();
        let (hash_tx, hash_rx) = unbounded();
        let published = Published {
            generation: u64::from(job.is_some()),
            job: job.map(Arc::new),
        };
        let shared = WorkerShared {
            published: Arc::new(ArcSwap::from_pointee(published)),
            active: Arc::new(AtomicBool::new(true)),
            idle: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(1)),
            failed: Arc::new(AtomicUsize::new(0)),
            fault_sender: fault_tx,
            share_sender: share_tx,
            hash_sender: Some(hash_tx),
            mask_table: Arc::new(MaskTable::default()),
            scan_chunk: 16,
        };
        (shared, share_rx, hash_rx)
    }

    fn worker(slice: Range<u64>, shared: WorkerShared) -> Worker {
        let algorithm = registry::lookup("sha256d").unwrap();
        Worker::new(0, algorithm, Arc::new(WorkRestart::new()), slice, shared)
    }

    #[test]
    fn scan_once_reports_hash_count() {
        let (shared, _shares, hashes) = shared(None);
        let mut worker = worker(0..100, shared);
        let job = Arc::new(Job::new("j", [0; 20], Target::ZERO));

        assert!(worker.scan_once(&job, 0, 10).is_err());
        worker.init(&AlgorithmParams::default()).unwrap();
        let result = worker.scan_once(&job, 0, 10).unwrap();
        assert_eq!(result.outcome, ScanOutcome::Exhausted);
        assert_eq!(hashes.try_recv().unwrap(), 10);
    }

    #[test]
    fn exhausted_slice_marks_worker_idle() {
        let (shared, shares, _hashes) = shared(Some(Job::new("j", [0; 20], Target::MAX)));
        let idle = shared.idle.clone();
        let live = shared.live.clone();
        let active = shared.active.clone();

        let mut worker = worker(40..48, shared);
        worker.init(&AlgorithmParams::default()).unwrap();
        let restart = worker.restart.clone();
        let handle = std::thread::spawn(move || worker.run());

        let deadline = Instant::now() + Duration::from_secs(10);
        while idle.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(idle.load(Ordering::SeqCst), 1);

        // every nonce in the slice meets the maximum target
        let nonces: Vec<u32> = shares.try_iter().map(|s| s.nonce).collect();
        assert_eq!(nonces, (40..48).collect::<Vec<u32>>());

        active.store(false, Ordering::SeqCst);
        restart.raise();
        handle.join().unwrap();
        assert_eq!(idle.load(Ordering::SeqCst), 0);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}
