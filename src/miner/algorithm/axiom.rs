// src/miner/algorithm/axiom.rs
//! AxiomHash: a Shabal-256 memory walk
//!
//! Each lane fills 65536 cells of 32 bytes by chaining Shabal-256 from the
//! header, then rewrites every cell from its predecessor and a
//! data-dependent partner. The last cell is the digest. The context keeps
//! four lanes of cells (8 MiB) so the scanner can hash four nonces per batch.

use super::digest;
use super::{Algorithm, AlgorithmParams, Descriptor, HashContext, alloc_scratch};
use crate::types::{HEADER_LEN, Hash256};
use crate::utils::error::MinerError;
use shabal::{Digest, Shabal256};

const DESCRIPTOR: Descriptor = Descriptor {
    name: "axiom",
    display_name: "AxiomHash",
    primary_digest: Some(digest::sha256d),
    secondary_digest: Some(digest::sha256d),
};

/// Cells per lane
const CELLS: usize = 65536;

/// Nonces hashed per batch
const LANES: usize = 4;

/// Shabal-256 memory walk, four lanes per batch
#[derive(Debug, Default)]
pub struct Axiom;

impl Algorithm for Axiom {
    fn descriptor(&self) -> &Descriptor {
        &DESCRIPTOR
    }

    fn init_context(&self, _params: &AlgorithmParams) -> Result<Box<dyn HashContext>, MinerError> {
        let cells = alloc_scratch::<Hash256>(DESCRIPTOR.name, LANES * CELLS, || {
            format!("{} lanes x {} cells", LANES, CELLS)
        })?;
        Ok(Box::new(AxiomContext {
            shabal: Shabal256::new(),
            cells,
        }))
    }
}

struct AxiomContext {
    /// Freshly initialized hasher, cloned for every cell
    shabal: Shabal256,
    cells: Vec<Hash256>,
}

impl AxiomContext {
    fn walk(shabal: &Shabal256, cells: &mut [Hash256], header: &[u8], out: &mut Hash256) {
        let mut h = shabal.clone();
        h.update(header);
        cells[0].copy_from_slice(&h.finalize());

        for i in 1..CELLS {
            let mut h = shabal.clone();
            h.update(cells[i - 1]);
            cells[i].copy_from_slice(&h.finalize());
        }

        for b in 0..CELLS {
            let p = if b > 0 { b - 1 } else { CELLS - 1 };
            let prev = &cells[p];
            let q = u32::from_le_bytes([prev[0], prev[1], prev[2], prev[3]]) % 0xffff;
            let j = (b + q as usize) % CELLS;

            let mut h = shabal.clone();
            h.update(cells[p]);
            h.update(cells[j]);
            cells[b].copy_from_slice(&h.finalize());
        }

        *out = cells[CELLS - 1];
    }
}

impl HashContext for AxiomContext {
    fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
        Self::walk(&self.shabal, &mut self.cells[..CELLS], header, out);
    }

    fn lanes(&self) -> usize {
        LANES
    }

    fn hash_lanes(&mut self, headers: &[[u8; HEADER_LEN]], out: &mut [Hash256]) {
        let lanes = self.cells.chunks_exact_mut(CELLS);
        for ((header, digest), cells) in headers.iter().zip(out.iter_mut()).zip(lanes) {
            Self::walk(&self.shabal, cells, header, digest);
        }
    }

    fn scratch_bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<Hash256>()
    }
}
