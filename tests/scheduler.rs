// tests/scheduler.rs
use powscan::miner::algorithm::Descriptor;
use powscan::miner::scheduler::nonce_slice;
use powscan::types::{Hash256, HEADER_LEN};
use powscan::{Algorithm, AlgorithmParams, HashContext, Job, MinerError, Scheduler, Share, Target, registry};
use crossbeam_channel::{Receiver, unbounded};
use std::sync::Arc;
use std::time::{Duration, Instant};

const GENESIS_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";

fn job(id: &str, target: Target) -> Job {
    Job::from_header_hex(id, GENESIS_HEX, target).unwrap()
}

fn easy() -> Target {
    Target::from_difficulty(1.0 / 65536.0).unwrap()
}

fn next_share(rx: &Receiver<Share>, job_id: &str) -> Share {
    let deadline = Instant::now() + Duration::from_secs(60);
    while Instant::now() < deadline {
        if let Ok(share) = rx.recv_timeout(Duration::from_millis(100)) {
            if share.job_id == job_id {
                return share;
            }
        }
    }
    panic!("no share for job {}", job_id);
}

#[test]
fn workers_find_verifiable_shares() {
    let algorithm = registry::lookup("sha256d").unwrap();
    let (tx, rx) = unbounded();
    let (hash_tx, hash_rx) = unbounded();
    let mut scheduler = Scheduler::new(tx, 4096).with_hash_sender(hash_tx);

    assert_eq!(scheduler.start_mining(algorithm.clone(), 2).unwrap(), 2);
    let job = job("easy", easy());
    scheduler.update_job(job.clone());

    let share = next_share(&rx, "easy");
    assert!(algorithm.verify(&job, share.nonce, &AlgorithmParams::default()).unwrap());
    assert!(nonce_slice(share.thr_id, 2).contains(&u64::from(share.nonce)));

    scheduler.stop();
    assert_eq!(scheduler.live_workers(), 0);
    assert!(hash_rx.try_iter().sum::<u64>() > 0);
}

#[test]
fn update_job_redirects_workers() {
    let algorithm = registry::lookup("sha256d").unwrap();
    let (tx, rx) = unbounded();
    let mut scheduler = Scheduler::new(tx, 1 << 20);
    scheduler.start_mining(algorithm, 3).unwrap();

    scheduler.update_job(job("impossible", Target::ZERO));
    std::thread::sleep(Duration::from_millis(50));
    scheduler.update_job(job("second", easy()));
    assert_eq!(scheduler.generation(), 2);

    let share = next_share(&rx, "second");
    assert_eq!(share.job_id, "second");
    assert!(!scheduler.is_exhausted());
    scheduler.stop();
}

static BROKEN: Descriptor = Descriptor {
    name: "broken",
    display_name: "Broken",
    primary_digest: None,
    secondary_digest: None,
};

/// Algorithm whose contexts can never be allocated
struct Broken;

impl Algorithm for Broken {
    fn descriptor(&self) -> &Descriptor {
        &BROKEN
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Err(MinerError::AllocationError {
            algorithm: "broken",
            bytes: usize::MAX,
            detail: "always fails".into(),
        })
    }
}

#[test]
fn no_usable_workers_is_fatal() {
    let (tx, _rx) = unbounded();
    let mut scheduler = Scheduler::new(tx, 16);
    match scheduler.start_mining(Arc::new(Broken), 2) {
        Err(MinerError::NoUsableWorkers { algorithm, requested }) => {
            assert_eq!(algorithm, "broken");
            assert_eq!(requested, 2);
        }
        other => panic!("expected NoUsableWorkers, got {:?}", other.map(|_| ())),
    }
    assert_eq!(scheduler.live_workers(), 0);
}

/// Context that fails only on the first thread to ask for one
struct FlakyContext;

impl HashContext for FlakyContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        *out = [0xff; 32];
        out[..4].copy_from_slice(&header[76..80]);
    }
}

struct Flaky {
    failed: std::sync::atomic::AtomicBool,
}

impl Algorithm for Flaky {
    fn descriptor(&self) -> &Descriptor {
        &BROKEN
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        use std::sync::atomic::Ordering;
        if self.failed.swap(true, Ordering::SeqCst) {
            Ok(Box::new(FlakyContext))
        } else {
            Err(MinerError::AllocationError {
                algorithm: "broken",
                bytes: 1,
                detail: "first context".into(),
            })
        }
    }
}

#[test]
fn failed_worker_does_not_stop_the_others() {
    let (tx, _rx) = unbounded();
    let mut scheduler = Scheduler::new(tx, 16);
    let flaky = Arc::new(Flaky {
        failed: std::sync::atomic::AtomicBool::new(false),
    });
    assert_eq!(scheduler.start_mining(flaky, 3).unwrap(), 2);
    assert_eq!(scheduler.live_workers(), 2);
    scheduler.stop();
}

/// Context whose scratch can never be resized for a new job
struct NoResizeContext;

impl HashContext for NoResizeContext {
    fn hash(&mut self, _header: &[u8; HEADER_LEN], out: &mut Hash256) {
        *out = [0xff; 32];
    }

    fn prepare_work(&mut self, _job: &Job) -> Result<(), MinerError> {
        Err(MinerError::AllocationError {
            algorithm: "broken",
            bytes: 1 << 40,
            detail: "N=1048576".into(),
        })
    }
}

struct NoResize;

impl Algorithm for NoResize {
    fn descriptor(&self) -> &Descriptor {
        &BROKEN
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(NoResizeContext))
    }
}

#[test]
fn workers_lost_on_job_switch_are_reported() {
    let (tx, _rx) = unbounded();
    let mut scheduler = Scheduler::new(tx, 16);
    assert_eq!(scheduler.start_mining(Arc::new(NoResize), 3).unwrap(), 3);
    assert!(scheduler.check_workers().is_ok());

    scheduler.update_job(job("resize", easy()));
    let deadline = Instant::now() + Duration::from_secs(10);
    while scheduler.live_workers() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(scheduler.live_workers(), 0);
    assert_eq!(scheduler.failed_workers(), 3);
    assert!(!scheduler.is_exhausted());
    assert!(!scheduler.is_stalled());
    match scheduler.check_workers() {
        Err(MinerError::AllocationError { algorithm, detail, .. }) => {
            assert_eq!(algorithm, "broken");
            assert_eq!(detail, "N=1048576");
        }
        other => panic!("expected the allocation failure, got {:?}", other),
    }
    scheduler.stop();
}
