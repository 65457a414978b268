// src/miner/algorithm/timetravel.rs
//! TimeTravel chain ordering
//!
//! TimeTravel chains eight 512-bit hash functions, the first over the
//! 80-byte header and each following one over the previous 64-byte output.
//! The order changes every second: ordering number
//! `(timestamp - GENESIS_TIMESTAMP) mod 8!` in lexicographic order of
//! [`SUB_HASHES`], with the subtraction wrapping like the 32-bit header
//! field. The order depends on nothing but the header timestamp, so a
//! context can compute it once per job in `prepare_work`.
//!
//! The chain itself is not registered. BLAKE-512, BMW-512, Luffa-512 and
//! CubeHash-512 have no implementation in the hash crates this engine
//! builds on.

/// One link of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubHash {
    /// BLAKE-512
    Blake512,
    /// Blue Midnight Wish 512
    Bmw512,
    /// Groestl-512
    Groestl512,
    /// Skein-512/512
    Skein512,
    /// JH-512
    Jh512,
    /// Keccak-512
    Keccak512,
    /// Luffa-512
    Luffa512,
    /// CubeHash-512
    CubeHash512,
}

/// Chain members in their base (ordering 0) order
pub const SUB_HASHES: [SubHash; 8] = [
    SubHash::Blake512,
    SubHash::Bmw512,
    SubHash::Groestl512,
    SubHash::Skein512,
    SubHash::Jh512,
    SubHash::Keccak512,
    SubHash::Luffa512,
    SubHash::CubeHash512,
];

/// Machinecoin genesis time; ordering 0 applies at this second
pub const GENESIS_TIMESTAMP: u32 = 1_389_040_865;

/// Number of distinct orderings, 8!
pub const PERMUTATION_COUNT: u32 = 40_320;

/// Ordering number for a header timestamp
pub fn permutation_index(timestamp: u32) -> u32 {
    timestamp.wrapping_sub(GENESIS_TIMESTAMP) % PERMUTATION_COUNT
}

/// Chain order for a header timestamp, first function first
pub fn permutation(timestamp: u32) -> [SubHash; 8] {
    nth_permutation(permutation_index(timestamp))
}

/// Chain order packed as nibbles, step `i` in bits `4i..4i+4`
///
/// Each nibble is the position of the step's function in [`SUB_HASHES`].
/// Ordering 0 packs to `0x76543210`.
pub fn packed(order: &[SubHash; 8]) -> u32 {
    order.iter().enumerate().fold(0, |acc, (step, sub)| {
        let position = SUB_HASHES.iter().position(|s| s == sub).unwrap_or(0) as u32;
        acc | (position << (4 * step))
    })
}

/// `index`-th lexicographic ordering, decoded digit by digit in the
/// factorial number system
fn nth_permutation(index: u32) -> [SubHash; 8] {
    let mut remaining = SUB_HASHES.to_vec();
    let mut order = SUB_HASHES;
    let mut rest = (index % PERMUTATION_COUNT) as usize;

    for (step, slot) in order.iter_mut().enumerate() {
        let weight = factorial(SUB_HASHES.len() - 1 - step);
        *slot = remaining.remove(rest / weight);
        rest %= weight;
    }
    order
}

fn factorial(n: usize) -> usize {
    (1..=n).product()
}
