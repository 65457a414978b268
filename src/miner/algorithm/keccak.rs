// src/miner/algorithm/keccak.rs
use super::digest;
use super::{Algorithm, AlgorithmParams, Descriptor, HashContext};
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use sha3::{Digest, Keccak256};

const DESCRIPTOR: Descriptor = Descriptor {
    name: "keccak",
    display_name: "Keccak",
    primary_digest: Some(digest::sha256),
    secondary_digest: Some(digest::sha256),
};

/// Single Keccak-256 (pre-standard padding, not SHA3-256)
#[derive(Debug, Default)]
pub struct Keccak;

impl Algorithm for Keccak {
    fn descriptor(&self) -> &Descriptor {
        &DESCRIPTOR
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(KeccakContext {
            hasher: Keccak256::new(),
        }))
    }
}

struct KeccakContext {
    hasher: Keccak256,
}

impl HashContext for KeccakContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        self.hasher.update(header);
        out.copy_from_slice(&self.hasher.finalize_reset());
    }
}
