// src/miner/job.rs
//! Jobs and work items
//!
//! A [`Job`] is what the coordinator publishes: a header template, a target
//! and optionally the coinbase it was built from. A [`WorkItem`] is one scan
//! request against a job: the job, a precomputed target tester and a
//! half-open nonce range.

use crate::miner::algorithm::Descriptor;
use crate::miner::target::{MaskTable, TargetTester};
use crate::types::{HEADER_LEN, HEADER_WORDS, Hash256, NONCE_OFFSET, NONCE_SPACE, NONCE_WORD, Target, TIME_WORD};
use crate::utils::error::MinerError;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// First header word of the merkle root
const MERKLE_WORD: usize = 9;

/// Header word holding the compact target
const BITS_WORD: usize = 18;

/// A unit of work published to all workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Identifier echoed back with every share
    pub job_id: String,
    /// Header template; word 19 is overwritten by the scanner
    pub header: [u32; HEADER_WORDS],
    /// Digests at or below this value are shares
    pub target: Target,
    /// Coinbase transaction the merkle root was built from, if known
    pub coinbase: Option<Vec<u8>>,
}

impl Job {
    /// Creates a job from header words
    pub fn new(job_id: impl Into<String>, header: [u32; HEADER_WORDS], target: Target) -> Self {
        Job {
            job_id: job_id.into(),
            header,
            target,
            coinbase: None,
        }
    }

    /// Creates a job from a serialized 80-byte header
    ///
    /// Each 4-byte group becomes one big-endian word, the inverse of
    /// [`Job::header_bytes`].
    pub fn from_header_bytes(job_id: impl Into<String>, bytes: &[u8; HEADER_LEN], target: Target) -> Self {
        let mut header = [0u32; HEADER_WORDS];
        for (word, chunk) in header.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self::new(job_id, header, target)
    }

    /// Creates a job from 160 hex characters of serialized header
    pub fn from_header_hex(job_id: impl Into<String>, hex_header: &str, target: Target) -> Result<Self, MinerError> {
        let raw = hex::decode(hex_header.trim())?;
        let bytes: [u8; HEADER_LEN] = raw.as_slice().try_into().map_err(|_| {
            MinerError::InputError(format!("Header must be {} bytes, got {}", HEADER_LEN, raw.len()))
        })?;
        Ok(Self::from_header_bytes(job_id, &bytes, target))
    }

    /// Attaches the coinbase transaction
    pub fn with_coinbase(mut self, coinbase: Vec<u8>) -> Self {
        self.coinbase = Some(coinbase);
        self
    }

    /// The header as hashed: every word big-endian
    pub fn header_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.header.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    /// The header as hashed, with `nonce` in the nonce field
    pub fn header_with_nonce(&self, nonce: u32) -> [u8; HEADER_LEN] {
        let mut bytes = self.header_bytes();
        bytes[NONCE_OFFSET..].copy_from_slice(&nonce.to_be_bytes());
        bytes
    }

    /// Nonce currently stored in the template
    pub fn nonce(&self) -> u32 {
        self.header[NONCE_WORD]
    }

    /// Block timestamp in Unix seconds
    ///
    /// The header field is little-endian on the wire, so the value is the
    /// byte-swapped word.
    pub fn timestamp(&self) -> u32 {
        self.header[TIME_WORD].swap_bytes()
    }

    /// Compact target (`nBits`) from the header
    pub fn compact_target(&self) -> u32 {
        self.header[BITS_WORD].swap_bytes()
    }

    /// Block height encoded in the coinbase, if any
    pub fn height(&self) -> Option<u32> {
        self.coinbase.as_deref().and_then(coinbase_height)
    }

    /// Writes a merkle root (in serialized byte order) into the header
    pub fn set_merkle_root(&mut self, root: &Hash256) {
        for (word, chunk) in self.header[MERKLE_WORD..].iter_mut().zip(root.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }
}

/// Reads the BIP34 block height pushed at the start of the coinbase script
///
/// Scans at most 128 bytes past offset 32 for the `0xffffffff` prevout
/// index, skips the script length byte and decodes the little-endian push
/// that follows. Pushes of 1 to 4 bytes are understood.
pub fn coinbase_height(coinbase: &[u8]) -> Option<u32> {
    let start = 32;
    let limit = coinbase.len().min(start + 128);
    let window = coinbase.get(start..limit)?;

    let run_start = window.iter().position(|&b| b == 0xff)?;
    let run = window[run_start..].iter().take_while(|&&b| b == 0xff).count();
    if run < 2 {
        return None;
    }

    // script length, then push length, then the height bytes
    let push_at = start + run_start + run + 1;
    let push_len = *coinbase.get(push_at)? as usize;
    if !(1..=4).contains(&push_len) {
        return None;
    }
    let digits = coinbase.get(push_at + 1..push_at + 1 + push_len)?;

    let mut le = [0u8; 4];
    le[..push_len].copy_from_slice(digits);
    Some(u32::from_le_bytes(le))
}

/// Merkle root from a coinbase and its branch
///
/// The coinbase is hashed with the algorithm's primary digest; each branch
/// is folded in as `secondary(root || branch)`.
pub fn merkle_root(descriptor: &Descriptor, coinbase: &[u8], branches: &[Hash256]) -> Result<Hash256, MinerError> {
    let (Some(primary), Some(secondary)) = (descriptor.primary_digest, descriptor.secondary_digest) else {
        return Err(MinerError::ConfigError(format!(
            "{} has no merkle digests",
            descriptor.name
        )));
    };

    let mut root = primary(coinbase);
    let mut buf = [0u8; 64];
    for branch in branches {
        buf[..32].copy_from_slice(&root);
        buf[32..].copy_from_slice(branch);
        root = secondary(&buf);
    }
    Ok(root)
}

/// On-disk job description used by the command line
///
/// ```json
/// { "job_id": "1", "header": "<160 hex chars>", "difficulty": 0.01 }
/// ```
///
/// Target precedence: `target`, then `difficulty`, then the header's `nBits`.
/// When `coinbase` is present the merkle root is rebuilt from it and
/// `merkle_branch`, overwriting the one in `header`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    /// Identifier echoed with shares
    pub job_id: String,
    /// Serialized header, 160 hex characters
    pub header: String,
    /// Full target in display order
    #[serde(default)]
    pub target: Option<String>,
    /// Pool share difficulty
    #[serde(default)]
    pub difficulty: Option<f64>,
    /// Serialized coinbase transaction
    #[serde(default)]
    pub coinbase: Option<String>,
    /// Merkle branch hashes in serialized byte order
    #[serde(default)]
    pub merkle_branch: Vec<String>,
}

impl JobFile {
    /// Reads and parses a job file
    pub fn load(path: &Path) -> Result<Self, MinerError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Builds a job for the given algorithm
    pub fn into_job(self, descriptor: &Descriptor) -> Result<Job, MinerError> {
        let mut job = Job::from_header_hex(self.job_id, &self.header, Target::ZERO)?;

        job.target = match (&self.target, self.difficulty) {
            (Some(hex_target), _) => Target::from_hex(hex_target)?,
            (None, Some(difficulty)) => Target::from_difficulty(difficulty)?,
            (None, None) => Target::from_compact(job.compact_target())?,
        };

        if let Some(coinbase) = &self.coinbase {
            let coinbase = hex::decode(coinbase.trim())?;
            let branches = self
                .merkle_branch
                .iter()
                .map(|b| -> Result<Hash256, MinerError> {
                    let raw = hex::decode(b.trim())?;
                    raw.as_slice()
                        .try_into()
                        .map_err(|_| MinerError::InputError(format!("Merkle branch must be 32 bytes: {}", b)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let root = merkle_root(descriptor, &coinbase, &branches)?;
            job.set_merkle_root(&root);
            job = job.with_coinbase(coinbase);
        }

        Ok(job)
    }
}

/// One scan request: a job, its tester and a nonce range
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Job being scanned
    pub job: Arc<Job>,
    /// Tester precomputed for the job's target
    pub tester: TargetTester,
    /// First nonce to try
    pub first_nonce: u32,
    /// Exclusive end of the range, at most 2^32
    pub max_nonce: u64,
}

impl WorkItem {
    /// Builds a work item over `[first_nonce, max_nonce)`
    ///
    /// # Arguments
    /// * `job` - Job to scan
    /// * `table` - Filter table used to pick the tester's mask
    /// * `first_nonce` - First nonce to try
    /// * `max_nonce` - Exclusive end, `first_nonce <= max_nonce <= 2^32`
    pub fn new(job: Arc<Job>, table: &MaskTable, first_nonce: u32, max_nonce: u64) -> Result<Self, MinerError> {
        if max_nonce > NONCE_SPACE || u64::from(first_nonce) > max_nonce {
            return Err(MinerError::InputError(format!(
                "Invalid nonce range [{:#x}, {:#x})",
                first_nonce, max_nonce
            )));
        }
        let tester = table.tester(job.target);
        Ok(WorkItem {
            job,
            tester,
            first_nonce,
            max_nonce,
        })
    }

    /// Number of nonces in the range
    pub fn len(&self) -> u64 {
        self.max_nonce - u64::from(self.first_nonce)
    }

    /// True when the range holds no nonce
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
