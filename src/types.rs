// src/types.rs
//! Wire-level types shared by the engine
//!
//! Headers are 80 bytes, handled as 20 words that are serialized big-endian
//! into the hash input. Digests and targets are 256-bit little-endian integers
//! split into 8 words, word 7 being the most significant.

use crate::utils::error::MinerError;
use std::fmt;

/// Serialized block header length in bytes
pub const HEADER_LEN: usize = 80;

/// Number of 32-bit words in a header
pub const HEADER_WORDS: usize = 20;

/// Word index of the timestamp field
pub const TIME_WORD: usize = 17;

/// Word index of the nonce field
pub const NONCE_WORD: usize = 19;

/// Byte offset of the nonce inside the serialized header
pub const NONCE_OFFSET: usize = NONCE_WORD * 4;

/// Size of the nonce space; exclusive upper bound for any `max_nonce`
pub const NONCE_SPACE: u64 = 1 << 32;

/// A 32-byte digest as produced by every algorithm
pub type Hash256 = [u8; 32];

/// Splits a digest into 8 little-endian words, word 7 most significant
#[inline]
pub fn hash_words(hash: &Hash256) -> [u32; 8] {
    let mut words = [0u32; 8];
    for (word, chunk) in words.iter_mut().zip(hash.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

/// Most significant digest word, the one the cheap filter looks at
#[inline]
pub fn hash_top_word(hash: &Hash256) -> u32 {
    u32::from_le_bytes([hash[28], hash[29], hash[30], hash[31]])
}

/// Hex of a digest in display order (most significant byte first)
///
/// This is the order block explorers print, e.g. `000000000019d6...` for
/// the Bitcoin genesis block.
pub fn display_hash(hash: &Hash256) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// 256-bit difficulty target
///
/// `Target.0[7]` is the most significant word. A digest meets the target
/// when its value is less than or equal to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target(pub [u32; 8]);

impl Target {
    /// Largest target; every digest meets it
    pub const MAX: Target = Target([u32::MAX; 8]);

    /// Smallest target; only the all-zero digest meets it
    pub const ZERO: Target = Target([0; 8]);

    /// Target words, word 7 most significant
    pub fn words(&self) -> &[u32; 8] {
        &self.0
    }

    /// Most significant word
    pub fn top_word(&self) -> u32 {
        self.0[7]
    }

    /// Parses 64 hex characters in display order (most significant first)
    pub fn from_hex(s: &str) -> Result<Self, MinerError> {
        let bytes = hex::decode(s.trim().trim_start_matches("0x"))?;
        if bytes.len() != 32 {
            return Err(MinerError::InputError(format!(
                "Target must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut words = [0u32; 8];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            words[7 - i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Target(words))
    }

    /// Expands a compact `nBits` value (as stored in header word 18)
    pub fn from_compact(bits: u32) -> Result<Self, MinerError> {
        let exponent = (bits >> 24) as usize;
        let mut mantissa = bits & 0x007f_ffff;
        if bits & 0x0080_0000 != 0 && mantissa != 0 {
            return Err(MinerError::InputError(format!(
                "Negative compact target: {:#010x}",
                bits
            )));
        }

        let mut le = [0u8; 32];
        let offset = if exponent <= 3 {
            mantissa >>= 8 * (3 - exponent);
            0
        } else {
            exponent - 3
        };
        for (k, byte) in mantissa.to_le_bytes()[..3].iter().enumerate() {
            match le.get_mut(offset + k) {
                Some(slot) => *slot = *byte,
                None if *byte == 0 => {}
                None => {
                    return Err(MinerError::InputError(format!(
                        "Compact target overflows 256 bits: {:#010x}",
                        bits
                    )));
                }
            }
        }

        let mut words = [0u32; 8];
        for (word, chunk) in words.iter_mut().zip(le.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Target(words))
    }

    /// Converts a pool share difficulty into a target
    ///
    /// Difficulty 1 maps to `0x00000000ffff0000...`; each factor of 2^32 moves
    /// the 64-bit quotient one word down.
    pub fn from_difficulty(difficulty: f64) -> Result<Self, MinerError> {
        if !difficulty.is_finite() || difficulty <= 0.0 {
            return Err(MinerError::InputError(format!(
                "Difficulty must be positive, got {}",
                difficulty
            )));
        }

        let mut diff = difficulty;
        let mut k = 6;
        while k > 0 && diff > 1.0 {
            diff /= 4_294_967_296.0;
            k -= 1;
        }

        let m = (4_294_901_760.0 / diff) as u64;
        if m == 0 && k == 6 {
            return Ok(Target::MAX);
        }

        let mut words = [0u32; 8];
        words[k] = m as u32;
        words[k + 1] = (m >> 32) as u32;
        Ok(Target(words))
    }

    /// Hex in display order, inverse of [`Target::from_hex`]
    pub fn to_hex(&self) -> String {
        let mut bytes = [0u8; 32];
        for (i, chunk) in bytes.chunks_exact_mut(4).enumerate() {
            chunk.copy_from_slice(&self.0[7 - i].to_be_bytes());
        }
        hex::encode(bytes)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const DIFF1: Target = Target([0, 0, 0, 0, 0, 0, 0xffff_0000, 0]);

    #[test]
    fn hex_roundtrip_keeps_word_order() {
        let t = Target::from_hex(
            "00000000ffff0000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        assert_eq!(t, DIFF1);
        assert_eq!(
            t.to_hex(),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn rejects_short_target_hex() {
        assert!(matches!(
            Target::from_hex("ffff"),
            Err(MinerError::InputError(_))
        ));
    }

    #[test]
    fn compact_difficulty_one() {
        assert_eq!(Target::from_compact(0x1d00_ffff).unwrap(), DIFF1);
    }

    #[test]
    fn compact_small_exponent_shifts_mantissa() {
        let t = Target::from_compact(0x0312_3456).unwrap();
        assert_eq!(t.0[0], 0x0012_3456);
        let t = Target::from_compact(0x0212_3456).unwrap();
        assert_eq!(t.0[0], 0x1234);
    }

    #[test]
    fn compact_rejects_negative_and_overflow() {
        assert!(Target::from_compact(0x0480_0001).is_err());
        assert!(Target::from_compact(0x2301_0000).is_err());
    }

    #[test]
    fn difficulty_one_and_two() {
        assert_eq!(Target::from_difficulty(1.0).unwrap(), DIFF1);
        let two = Target::from_difficulty(2.0).unwrap();
        assert_eq!(two.0[7], 0);
        assert_eq!(two.0[6], 0x7fff_8000);
        assert_eq!(two.0[5], 0);
    }

    #[test]
    fn fractional_difficulty_raises_top_word() {
        let t = Target::from_difficulty(1.0 / 65536.0).unwrap();
        assert_eq!(t.0[7], 0xffff);
        assert_eq!(t.0[6], 0);
    }

    #[test]
    fn difficulty_must_be_positive() {
        assert!(Target::from_difficulty(0.0).is_err());
        assert!(Target::from_difficulty(f64::NAN).is_err());
    }

    #[test]
    fn digest_words_are_little_endian() {
        let genesis = hex!("6fe28c0ab6f1b372c1a6a246ae63f74f931e8365e15a089c68d6190000000000");
        let words = hash_words(&genesis);
        assert_eq!(words[7], 0);
        assert_eq!(words[6], 0x0019_d668);
        assert_eq!(hash_top_word(&genesis), 0);
        assert_eq!(
            display_hash(&genesis),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }
}
