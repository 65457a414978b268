// src/miner/algorithm/mod.rs
//! Proof-of-work algorithm implementations
//!
//! This module contains the common interface for hash algorithms and the
//! concrete algorithms shipped with the engine:
//! - scrypt (fixed N=1024) and scrypt-n (time-scaled N)
//! - sha256d
//! - keccak
//! - skein
//! - groestl, myr-groestl, myr-groestl2
//! - axiom (Shabal-256 memory walk, 4 lanes per batch)
//!
//! [`timetravel`] holds the timestamp-keyed chain ordering used by the
//! TimeTravel family, which is not registered.
//!
//! An [`Algorithm`] is a stateless, shareable descriptor. Each worker thread
//! gets its own [`HashContext`] from [`Algorithm::init_context`], which owns
//! whatever scratch memory the algorithm needs. Dropping the context frees it.

/// SHA-256 building blocks used as hash and merkle digests
pub mod digest;

/// Name-keyed table of every available algorithm
pub mod registry;

/// Scrypt with fixed and time-scaled memory cost
pub mod scrypt;

/// Double SHA-256
pub mod sha256d;

/// Keccak-256
pub mod keccak;

/// Skein-512 followed by SHA-256
pub mod skein;

/// Groestl-512 family
pub mod groestl;

/// Shabal-256 memory walk
pub mod axiom;

/// Chain order of the TimeTravel family as a function of the timestamp
pub mod timetravel;

use crate::miner::job::{Job, WorkItem};
use crate::miner::restart::WorkRestart;
use crate::miner::scanner::{self, ScanResult};
use crate::miner::target::fulltest;
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};

pub use registry::Registry;

/// Digest function used for coinbase and merkle-branch hashing
pub type DigestFn = fn(&[u8]) -> Hash256;

/// Static metadata describing an algorithm
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    /// Lowercase lookup key
    pub name: &'static str,
    /// Human-readable name for logs
    pub display_name: &'static str,
    /// Digest applied to the coinbase transaction
    pub primary_digest: Option<DigestFn>,
    /// Digest applied when folding merkle branches
    pub secondary_digest: Option<DigestFn>,
}

/// Cost parameters shared by all contexts of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmParams {
    /// Unix time at which the scrypt-n cost starts to grow
    pub nfactor_start_time: u32,
    /// Lower bound on the scrypt-n N-factor
    pub nfactor_min: u8,
    /// Upper bound on the scrypt-n N-factor
    pub nfactor_max: u8,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        AlgorithmParams {
            nfactor_start_time: scrypt::DEFAULT_NFACTOR_START,
            nfactor_min: scrypt::NFACTOR_MIN,
            nfactor_max: scrypt::NFACTOR_MAX,
        }
    }
}

/// Per-thread hashing state
///
/// Contexts are created on the thread that uses them and never shared.
/// `Send` is required only so a context can be built on one thread and
/// moved into a freshly spawned worker.
pub trait HashContext: Send {
    /// Hashes one 80-byte header into `out`
    ///
    /// Must depend only on the header bytes and the state set by the last
    /// [`HashContext::prepare_work`] call.
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256);

    /// Number of headers the context prefers to hash at once
    fn lanes(&self) -> usize {
        1
    }

    /// Hashes several headers; `out[i]` receives the digest of `headers[i]`
    ///
    /// `headers` may be shorter than [`HashContext::lanes`] for the final
    /// partial batch of a range.
    fn hash_lanes(&mut self, headers: &[[u8; HEADER_LEN]], out: &mut [Hash256]) {
        for (header, digest) in headers.iter().zip(out.iter_mut()) {
            self.hash(header, digest);
        }
    }

    /// Adjusts cost parameters for a new job before any scan of it
    fn prepare_work(&mut self, _job: &Job) -> Result<(), MinerError> {
        Ok(())
    }

    /// Bytes of scratch memory currently held
    fn scratch_bytes(&self) -> usize {
        0
    }
}

/// Common interface for all proof-of-work algorithms
///
/// All implementations must provide a descriptor and a way to build a
/// per-thread context. Scanning and share verification have default
/// implementations built on the context.
pub trait Algorithm: Send + Sync {
    /// Static metadata for this algorithm
    fn descriptor(&self) -> &Descriptor;

    /// Lowercase registry name
    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Builds a fresh context, allocating its scratch memory
    ///
    /// # Arguments
    /// * `params` - Cost parameters for algorithms whose memory use varies
    ///
    /// # Returns
    /// A ready context, or [`MinerError::AllocationError`] when scratch
    /// memory cannot be obtained
    fn init_context(&self, params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError>;

    /// Scans one work item with a thread's context
    ///
    /// # Arguments
    /// * `thr_id` - Worker index, used for logging only
    /// * `work` - Job, target tester and nonce range
    /// * `ctx` - The calling thread's context, already prepared for `work.job`
    /// * `restart` - The calling thread's restart signal
    fn scan(
        &self,
        thr_id: usize,
        work: &WorkItem,
        ctx: &mut dyn HashContext,
        restart: &WorkRestart,
    ) -> ScanResult {
        scanner::scan(thr_id, work, ctx, restart)
    }

    /// Hashes a job's header with `nonce` using a throwaway context
    fn digest(&self, job: &Job, nonce: u32, params: &AlgorithmParams) -> Result<Hash256, MinerError> {
        let mut ctx = self.init_context(params)?;
        ctx.prepare_work(job)?;
        let mut out = [0u8; 32];
        ctx.hash(&job.header_with_nonce(nonce), &mut out);
        Ok(out)
    }

    /// Recomputes the digest for `nonce` and checks it against the job target
    ///
    /// # Returns
    /// `true` if the digest is less than or equal to the target
    fn verify(&self, job: &Job, nonce: u32, params: &AlgorithmParams) -> Result<bool, MinerError> {
        let hash = self.digest(job, nonce, params)?;
        Ok(fulltest(&hash, &job.target))
    }
}

/// Allocates a zeroed scratch buffer without aborting on failure
///
/// # Arguments
/// * `algorithm` - Name reported in the error
/// * `len` - Number of elements
/// * `detail` - Cost parameters that produced the request
pub(crate) fn alloc_scratch<T: Clone + Default>(
    algorithm: &'static str,
    len: usize,
    detail: impl FnOnce() -> String,
) -> Result<Vec<T>, MinerError> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut buf = Vec::new();
    if buf.try_reserve_exact(len).is_err() {
        return Err(MinerError::AllocationError {
            algorithm,
            bytes,
            detail: detail(),
        });
    }
    buf.resize(len, T::default());
    Ok(buf)
}
