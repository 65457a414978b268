// src/miner/algorithm/digest.rs
use crate::types::Hash256;
use sha2::{Digest, Sha256};

/// Single SHA-256
pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice
pub fn sha256d(data: &[u8]) -> Hash256 {
    Sha256::digest(Sha256::digest(data)).into()
}
