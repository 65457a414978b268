// src/miner/algorithm/scrypt.rs
//! Scrypt proof-of-work (r=1, p=1)
//!
//! The header is both password and salt. Two variants are registered:
//! - `scrypt`: N fixed at 1024, 128 KiB of scratch per thread
//! - `scrypt-n`: N grows with the job timestamp; the scratch is resized in
//!   `prepare_work` whenever a new job lands in a different N-factor
//!
//! ROMix and BlockMix live here; PBKDF2-HMAC-SHA256 comes from `pbkdf2`.

use super::digest;
use super::{Algorithm, AlgorithmParams, Descriptor, HashContext, alloc_scratch};
use crate::miner::job::Job;
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// Memory cost of plain `scrypt`
pub const SCRYPT_N: usize = 1024;

/// Default start of the N-factor schedule
pub const DEFAULT_NFACTOR_START: u32 = 1_389_306_217;

/// Smallest N-factor the schedule ever returns
pub const NFACTOR_MIN: u8 = 4;

/// Largest N-factor accepted in configuration
pub const NFACTOR_MAX: u8 = 30;

/// Words in one BlockMix block for r = 1
const BLOCK_WORDS: usize = 32;

const SCRYPT: Descriptor = Descriptor {
    name: "scrypt",
    display_name: "scrypt(1024, 1, 1)",
    primary_digest: Some(digest::sha256d),
    secondary_digest: Some(digest::sha256d),
};

const SCRYPT_NFACTOR: Descriptor = Descriptor {
    name: "scrypt-n",
    display_name: "scrypt-N (time-scaled)",
    primary_digest: Some(digest::sha256d),
    secondary_digest: Some(digest::sha256d),
};

/// N-factor for a header timestamp
///
/// Before the schedule start this is `nfactor_min`. Afterwards it grows by
/// roughly 1.7 per doubling of elapsed seconds, clamped to the configured
/// bounds. `N = 2^(nfactor + 1)`.
pub fn nfactor(timestamp: u32, params: &AlgorithmParams) -> u8 {
    let min = params.nfactor_min;
    let max = params.nfactor_max.max(min);
    if timestamp <= params.nfactor_start_time {
        return min;
    }

    let mut s = timestamp - params.nfactor_start_time;
    let mut l: i64 = 0;
    while (s >> 1) > 3 {
        l += 1;
        s >>= 1;
    }
    s &= 3;

    let n = (l * 170 + i64::from(s) * 25 - 2320) / 100;
    (n.clamp(0, 255) as u8).clamp(min, max)
}

/// Scrypt N for an N-factor, `None` if it does not fit in `usize`
pub fn n_for(nfactor: u8) -> Option<usize> {
    1usize.checked_shl(u32::from(nfactor) + 1)
}

#[inline(always)]
fn quarter(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[b] ^= x[a].wrapping_add(x[d]).rotate_left(7);
    x[c] ^= x[b].wrapping_add(x[a]).rotate_left(9);
    x[d] ^= x[c].wrapping_add(x[b]).rotate_left(13);
    x[a] ^= x[d].wrapping_add(x[c]).rotate_left(18);
}

/// `b ^= bx`, then Salsa20/8 core on `b` in place
fn xor_salsa8(b: &mut [u32], bx: &[u32]) {
    for (w, x) in b.iter_mut().zip(bx) {
        *w ^= *x;
    }
    let mut x = [0u32; 16];
    x.copy_from_slice(&b[..16]);
    for _ in 0..4 {
        quarter(&mut x, 0, 4, 8, 12);
        quarter(&mut x, 5, 9, 13, 1);
        quarter(&mut x, 10, 14, 2, 6);
        quarter(&mut x, 15, 3, 7, 11);

        quarter(&mut x, 0, 1, 2, 3);
        quarter(&mut x, 5, 6, 7, 4);
        quarter(&mut x, 10, 11, 8, 9);
        quarter(&mut x, 15, 12, 13, 14);
    }
    for (w, x) in b.iter_mut().zip(x.iter()) {
        *w = w.wrapping_add(*x);
    }
}

fn block_mix(x: &mut [u32; BLOCK_WORDS]) {
    let (lo, hi) = x.split_at_mut(16);
    xor_salsa8(lo, hi);
    xor_salsa8(hi, lo);
}

/// Sequential memory-hard mix; `v` must hold at least `n * 32` words
fn romix(x: &mut [u32; BLOCK_WORDS], v: &mut [u32], n: usize) {
    for block in v.chunks_exact_mut(BLOCK_WORDS).take(n) {
        block.copy_from_slice(x);
        block_mix(x);
    }
    for _ in 0..n {
        let j = (x[16] as usize) & (n - 1);
        let block = &v[j * BLOCK_WORDS..(j + 1) * BLOCK_WORDS];
        for (w, s) in x.iter_mut().zip(block) {
            *w ^= *s;
        }
        block_mix(x);
    }
}

/// scrypt(password, salt, N, r=1, p=1) into `out`
///
/// `n` must be a power of two and `v` at least `n * 32` words long.
pub(crate) fn scrypt_r1(password: &[u8], salt: &[u8], n: usize, v: &mut [u32], out: &mut [u8]) {
    let mut b = [0u8; 4 * BLOCK_WORDS];
    pbkdf2_hmac::<Sha256>(password, salt, 1, &mut b);

    let mut x = [0u32; BLOCK_WORDS];
    for (w, c) in x.iter_mut().zip(b.chunks_exact(4)) {
        *w = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
    }
    romix(&mut x, v, n);
    for (c, w) in b.chunks_exact_mut(4).zip(x.iter()) {
        c.copy_from_slice(&w.to_le_bytes());
    }

    pbkdf2_hmac::<Sha256>(password, &b, 1, out);
}

fn scratch_for(algorithm: &'static str, n: usize) -> Result<Vec<u32>, MinerError> {
    let words = n.checked_mul(BLOCK_WORDS).ok_or_else(|| MinerError::AllocationError {
        algorithm,
        bytes: usize::MAX,
        detail: format!("N={}", n),
    })?;
    alloc_scratch(algorithm, words, || format!("N={}", n))
}

/// Litecoin-style scrypt, N = 1024
#[derive(Debug, Default)]
pub struct Scrypt;

impl Algorithm for Scrypt {
    fn descriptor(&self) -> &Descriptor {
        &SCRYPT
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(ScryptContext {
            scratch: scratch_for(SCRYPT.name, SCRYPT_N)?,
            n: SCRYPT_N,
            schedule: None,
        }))
    }
}

/// Scrypt whose N follows the header timestamp
#[derive(Debug, Default)]
pub struct ScryptN;

impl Algorithm for ScryptN {
    fn descriptor(&self) -> &Descriptor {
        &SCRYPT_NFACTOR
    }

    fn init_context(&self, params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        let nf = params.nfactor_min;
        let n = n_for(nf).ok_or_else(|| MinerError::ConfigError(format!("N-factor {} too large", nf)))?;
        Ok(Box::new(ScryptContext {
            scratch: scratch_for(SCRYPT_NFACTOR.name, n)?,
            n,
            schedule: Some(Schedule {
                params: *params,
                nfactor: nf,
            }),
        }))
    }
}

struct Schedule {
    params: AlgorithmParams,
    nfactor: u8,
}

struct ScryptContext {
    scratch: Vec<u32>,
    n: usize,
    schedule: Option<Schedule>,
}

impl HashContext for ScryptContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        scrypt_r1(header, header, self.n, &mut self.scratch, out);
    }

    fn prepare_work(&mut self, job: &Job) -> Result<(), MinerError> {
        let Some(schedule) = self.schedule.as_mut() else {
            return Ok(());
        };
        let nf = nfactor(job.timestamp(), &schedule.params);
        if nf == schedule.nfactor {
            return Ok(());
        }

        let n = n_for(nf).ok_or_else(|| MinerError::ConfigError(format!("N-factor {} too large", nf)))?;
        // the old buffer stays in place if the new one cannot be had
        self.scratch = scratch_for(SCRYPT_NFACTOR.name, n)?;
        self.n = n;
        schedule.nfactor = nf;
        log::debug!(
            "scrypt-n: job {} uses N-factor {} (N={}, {} KiB scratch)",
            job.job_id,
            nf,
            n,
            self.scratch_bytes() / 1024
        );
        Ok(())
    }

    fn scratch_bytes(&self) -> usize {
        self.scratch.len() * std::mem::size_of::<u32>()
    }
}
