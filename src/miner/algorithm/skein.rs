// src/miner/algorithm/skein.rs
use super::digest;
use super::{Algorithm, AlgorithmParams, Descriptor, HashContext};
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use sha2::Sha256;
use skein::digest::consts::U64;
use skein::{Digest, Skein512};

const DESCRIPTOR: Descriptor = Descriptor {
    name: "skein",
    display_name: "Skein",
    primary_digest: Some(digest::sha256d),
    secondary_digest: Some(digest::sha256d),
};

/// Skein-512/512 of the header, then SHA-256 of that
#[derive(Debug, Default)]
pub struct Skein;

impl Algorithm for Skein {
    fn descriptor(&self) -> &Descriptor {
        &DESCRIPTOR
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(SkeinContext {
            skein: Skein512::<U64>::new(),
            sha: Sha256::new(),
        }))
    }
}

struct SkeinContext {
    skein: Skein512<U64>,
    sha: Sha256,
}

impl HashContext for SkeinContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        self.skein.update(header);
        let wide = self.skein.finalize_reset();
        self.sha.update(wide);
        out.copy_from_slice(&self.sha.finalize_reset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// Bitcoin genesis header
    const GENESIS: [u8; HEADER_LEN] = hex!(
        "010000000000000000000000000000000000000000000000000000000000000000000000"
        "3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49"
        "ffff001d1dac2b7c"
    );

    #[test]
    fn genesis_header_digest() {
        let mut ctx = Skein.init_context(&AlgorithmParams::default()).unwrap();
        let mut out = [0u8; 32];
        ctx.hash(&GENESIS, &mut out);
        assert_eq!(out, hex!("d020fec8cd79ad48e5dd62d99521a64835c5692f79d9e1bcbda33d6580ed1271"));
    }

    #[test]
    fn chains_skein_into_sha256() {
        let header = [0x11u8; HEADER_LEN];
        let expected = digest::sha256(&Skein512::<U64>::digest(header));

        let mut ctx = Skein.init_context(&AlgorithmParams::default()).unwrap();
        let mut out = [0u8; 32];
        ctx.hash(&header, &mut out);
        assert_eq!(out, expected);
        ctx.hash(&header, &mut out);
        assert_eq!(out, expected);
    }
}
