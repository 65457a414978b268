// src/miner/algorithm/groestl.rs
//! Groestl-512 based algorithms
//!
//! Three registry entries share one context type:
//! - `groestl`: Groestl-512 twice, truncated to 32 bytes
//! - `myr-groestl`: Groestl-512 then SHA-256, SHA-256 for coinbase and merkle
//! - `myr-groestl2`: same hash as `myr-groestl`, double SHA-256 for merkle

use super::digest;
use super::{Algorithm, AlgorithmParams, Descriptor, HashContext};
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use groestl::{Digest, Groestl512};
use sha2::Sha256;

const GROESTL: Descriptor = Descriptor {
    name: "groestl",
    display_name: "Groestl",
    primary_digest: Some(digest::sha256),
    secondary_digest: Some(digest::sha256),
};

const MYR_GROESTL: Descriptor = Descriptor {
    name: "myr-groestl",
    display_name: "Myriadcoin-groestl",
    primary_digest: Some(digest::sha256),
    secondary_digest: Some(digest::sha256),
};

const MYR_GROESTL2: Descriptor = Descriptor {
    name: "myr-groestl2",
    display_name: "Myriadcoin-groestl",
    primary_digest: Some(digest::sha256d),
    secondary_digest: Some(digest::sha256d),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    /// Second Groestl-512 pass, first 32 bytes kept
    Groestl,
    /// SHA-256 of the Groestl-512 output
    Sha256,
}

/// Double Groestl-512
#[derive(Debug, Default)]
pub struct Groestl;

/// Groestl-512 followed by SHA-256
#[derive(Debug)]
pub struct MyrGroestl {
    descriptor: &'static Descriptor,
}

impl MyrGroestl {
    /// Variant with single SHA-256 merkle digests
    pub fn new() -> Self {
        MyrGroestl {
            descriptor: &MYR_GROESTL,
        }
    }

    /// Variant with double SHA-256 merkle digests
    pub fn sha256d_merkle() -> Self {
        MyrGroestl {
            descriptor: &MYR_GROESTL2,
        }
    }
}

impl Default for MyrGroestl {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for Groestl {
    fn descriptor(&self) -> &Descriptor {
        &GROESTL
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(GroestlContext::new(Finish::Groestl)))
    }
}

impl Algorithm for MyrGroestl {
    fn descriptor(&self) -> &Descriptor {
        self.descriptor
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        Ok(Box::new(GroestlContext::new(Finish::Sha256)))
    }
}

struct GroestlContext {
    groestl: Groestl512,
    sha: Sha256,
    finish: Finish,
}

impl GroestlContext {
    fn new(finish: Finish) -> Self {
        GroestlContext {
            groestl: Groestl512::new(),
            sha: Sha256::new(),
            finish,
        }
    }
}

impl HashContext for GroestlContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        self.groestl.update(header);
        let wide = self.groestl.finalize_reset();
        match self.finish {
            Finish::Groestl => {
                self.groestl.update(wide);
                out.copy_from_slice(&self.groestl.finalize_reset()[..32]);
            }
            Finish::Sha256 => {
                self.sha.update(wide);
                out.copy_from_slice(&self.sha.finalize_reset());
            }
        }
    }
}
