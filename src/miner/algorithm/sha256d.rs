// src/miner/algorithm/sha256d.rs
//! Double SHA-256 over the raw header
//!
//! No scratch memory; the context only keeps a reusable hasher.

use super::digest;
use super::{Algorithm, AlgorithmParams, Descriptor, HashContext};
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use sha2::{Digest, Sha256};

const DESCRIPTOR: Descriptor = Descriptor {
    name: "sha256d",
    display_name: "SHA-256d",
    primary_digest: Some(digest::sha256d),
    secondary_digest: Some(digest::sha256d),
};

/// Bitcoin-style double SHA-256
#[derive(Debug, Default)]
pub struct Sha256d;

impl Algorithm for Sha256d {
    fn descriptor(&self) -> &Descriptor {
        &DESCRIPTOR
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(Sha256dContext {
            hasher: Sha256::new(),
        }))
    }
}

struct Sha256dContext {
    hasher: Sha256,
}

impl HashContext for Sha256dContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        self.hasher.update(header);
        let first = self.hasher.finalize_reset();
        self.hasher.update(first);
        out.copy_from_slice(&self.hasher.finalize_reset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const GENESIS: [u8; HEADER_LEN] = hex!(
        "010000000000000000000000000000000000000000000000000000000000000000000000"
        "3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49"
        "ffff001d1dac2b7c"
    );

    #[test]
    fn genesis_digest() {
        let mut ctx = Sha256d.init_context(&AlgorithmParams::default()).unwrap();
        let mut out = [0u8; 32];
        ctx.hash(&GENESIS, &mut out);
        assert_eq!(
            out,
            hex!("6fe28c0ab6f1b372c1a6a246ae63f74f931e8365e15a089c68d6190000000000")
        );
        // hasher state must not leak between calls
        ctx.hash(&GENESIS, &mut out);
        assert_eq!(out, digest::sha256d(&GENESIS));
    }
}
