// src/miner/target.rs
//! Two-tier target testing
//!
//! Every candidate digest first goes through a one-word filter on its most
//! significant word. Only survivors are compared against the full 256-bit
//! target. The filter mask is picked once per work item from a bucket table
//! keyed on the target's top word, so the per-candidate cost is one AND.

use crate::types::{Hash256, Target, hash_top_word, hash_words};
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};

/// One row of the filter table
///
/// Targets whose top word is `<= threshold` (and above the previous row)
/// use `mask`. A digest passes the filter when `top & mask == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterBucket {
    /// Inclusive upper bound on the target's top word
    pub threshold: u32,
    /// Bits that must be clear in the digest's top word
    pub mask: u32,
}

const fn bucket(threshold: u32, mask: u32) -> FilterBucket {
    FilterBucket { threshold, mask }
}

/// Nine buckets at nibble granularity, open-ended last row
const DEFAULT_BUCKETS: [FilterBucket; 9] = [
    bucket(0x0000_0000, 0xFFFF_FFFF),
    bucket(0x0000_000F, 0xFFFF_FFF0),
    bucket(0x0000_00FF, 0xFFFF_FF00),
    bucket(0x0000_0FFF, 0xFFFF_F000),
    bucket(0x0000_FFFF, 0xFFFF_0000),
    bucket(0x000F_FFFF, 0xFFF0_0000),
    bucket(0x00FF_FFFF, 0xFF00_0000),
    bucket(0x0FFF_FFFF, 0xF000_0000),
    bucket(u32::MAX, 0),
];

/// Six-bucket table for builds that prefer fewer comparisons on setup
const COARSE_BUCKETS: [FilterBucket; 6] = [
    bucket(0x0000_0000, 0xFFFF_FFFF),
    bucket(0x0000_000F, 0xFFFF_FFF0),
    bucket(0x0000_00FF, 0xFFFF_FF00),
    bucket(0x0000_0FFF, 0xFFFF_F000),
    bucket(0x0000_FFFF, 0xFFFF_0000),
    bucket(u32::MAX, 0),
];

/// All bits at or below the highest set bit of `value`
fn smear(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        u32::MAX >> value.leading_zeros()
    }
}

/// Validated bucket table mapping a target's top word to a filter mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskTable {
    buckets: Vec<FilterBucket>,
}

impl MaskTable {
    /// Builds a table from custom buckets
    ///
    /// Buckets must be strictly ascending, the last threshold must be
    /// `u32::MAX` so every target is covered, and no mask may clear a bit
    /// that a top word at or below its threshold could have set. The last
    /// condition is what keeps the filter free of false negatives.
    pub fn new(buckets: Vec<FilterBucket>) -> Result<Self, MinerError> {
        let Some(last) = buckets.last() else {
            return Err(MinerError::ConfigError("Filter table is empty".into()));
        };
        if last.threshold != u32::MAX {
            return Err(MinerError::ConfigError(format!(
                "Last filter threshold must be {:#x}, got {:#x}",
                u32::MAX,
                last.threshold
            )));
        }
        for pair in buckets.windows(2) {
            if pair[0].threshold >= pair[1].threshold {
                return Err(MinerError::ConfigError(format!(
                    "Filter thresholds must ascend: {:#x} then {:#x}",
                    pair[0].threshold, pair[1].threshold
                )));
            }
        }
        if let Some(bad) = buckets.iter().find(|b| b.mask & smear(b.threshold) != 0) {
            return Err(MinerError::ConfigError(format!(
                "Filter mask {:#010x} rejects digests below threshold {:#010x}",
                bad.mask, bad.threshold
            )));
        }
        Ok(MaskTable { buckets })
    }

    /// The six-bucket variant
    pub fn coarse() -> Self {
        MaskTable {
            buckets: COARSE_BUCKETS.to_vec(),
        }
    }

    /// Rows of the table in ascending threshold order
    pub fn buckets(&self) -> &[FilterBucket] {
        &self.buckets
    }

    /// Mask for the first bucket whose threshold covers the target's top word
    pub fn mask_for(&self, target: &Target) -> u32 {
        let top = target.top_word();
        self.buckets
            .iter()
            .find(|b| top <= b.threshold)
            .map_or(0, |b| b.mask)
    }

    /// Precomputes a tester for one work item
    pub fn tester(&self, target: Target) -> TargetTester {
        TargetTester {
            target,
            mask: self.mask_for(&target),
        }
    }
}

impl Default for MaskTable {
    fn default() -> Self {
        MaskTable {
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

/// Exact 256-bit comparison: true iff `hash <= target`
///
/// Words are compared from most to least significant; the first unequal
/// pair decides.
pub fn fulltest(hash: &Hash256, target: &Target) -> bool {
    let words = hash_words(hash);
    for i in (0..8).rev() {
        if words[i] != target.0[i] {
            return words[i] < target.0[i];
        }
    }
    true
}

/// Target plus its precomputed filter mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetTester {
    target: Target,
    mask: u32,
}

impl TargetTester {
    /// Tester using the default table
    pub fn new(target: Target) -> Self {
        MaskTable::default().tester(target)
    }

    /// Target being tested against
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Filter mask chosen for the target
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Cheap filter on the digest's top word
    #[inline]
    pub fn passes_filter(&self, hash: &Hash256) -> bool {
        hash_top_word(hash) & self.mask == 0
    }

    /// Filter, then exact test for survivors
    #[inline]
    pub fn test(&self, hash: &Hash256) -> bool {
        self.passes_filter(hash) && fulltest(hash, &self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_with(words: [u32; 8]) -> Hash256 {
        let mut hash = [0u8; 32];
        for (chunk, word) in hash.chunks_exact_mut(4).zip(words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        hash
    }

    fn target_with_top(top: u32) -> Target {
        let mut words = [u32::MAX; 8];
        words[7] = top;
        Target(words)
    }

    #[test]
    fn fulltest_is_less_or_equal() {
        let target = Target([5, 0, 0, 0, 0, 0, 0, 1]);
        assert!(fulltest(&digest_with([5, 0, 0, 0, 0, 0, 0, 1]), &target));
        assert!(fulltest(&digest_with([4, 0, 0, 0, 0, 0, 0, 1]), &target));
        assert!(!fulltest(&digest_with([6, 0, 0, 0, 0, 0, 0, 1]), &target));
        assert!(fulltest(&digest_with([u32::MAX, 0, 0, 0, 0, 0, 0, 0]), &target));
        assert!(!fulltest(&digest_with([0, 0, 0, 0, 0, 0, 0, 2]), &target));
    }

    #[test]
    fn default_table_picks_nibble_masks() {
        let table = MaskTable::default();
        assert_eq!(table.mask_for(&target_with_top(0)), 0xFFFF_FFFF);
        assert_eq!(table.mask_for(&target_with_top(0x10)), 0xFFFF_FF00);
        assert_eq!(table.mask_for(&target_with_top(0xFFFF)), 0xFFFF_0000);
        assert_eq!(table.mask_for(&target_with_top(0x1000_0000)), 0);
        assert_eq!(table.mask_for(&target_with_top(u32::MAX)), 0);
    }

    #[test]
    fn builtin_tables_validate() {
        assert!(MaskTable::new(DEFAULT_BUCKETS.to_vec()).is_ok());
        assert!(MaskTable::new(COARSE_BUCKETS.to_vec()).is_ok());
    }

    #[test]
    fn rejects_unsound_or_incomplete_tables() {
        assert!(MaskTable::new(vec![]).is_err());
        assert!(MaskTable::new(vec![bucket(0xFF, 0)]).is_err());
        assert!(MaskTable::new(vec![bucket(0xFF, 0xFFFF_FFF0), bucket(u32::MAX, 0)]).is_err());
        assert!(MaskTable::new(vec![bucket(0xFF, 0), bucket(0xF, 0), bucket(u32::MAX, 0)]).is_err());
    }

    #[test]
    fn filter_never_rejects_a_passing_digest() {
        let mut tops = Vec::new();
        for b in MaskTable::default().buckets() {
            let t = b.threshold;
            tops.extend([t.saturating_sub(1), t, t.saturating_add(1)]);
        }
        tops.extend([0x1000_0000, 0x8000_0000, 0x7FFF_FFFF, 0x0123_4567]);

        for table in [MaskTable::default(), MaskTable::coarse()] {
            for &top in &tops {
                let tester = table.tester(target_with_top(top));
                let samples = [0, 1, top / 2, top.saturating_sub(1), top, top & 0xF0F0_F0F0];
                for &d in samples.iter().filter(|&&d| d <= top) {
                    let hash = digest_with([0, 0, 0, 0, 0, 0, 0, d]);
                    assert!(fulltest(&hash, tester.target()));
                    assert!(
                        tester.passes_filter(&hash),
                        "top {:#x} digest {:#x} mask {:#x}",
                        top,
                        d,
                        tester.mask()
                    );
                    assert!(tester.test(&hash));
                }
            }
        }
    }

    #[test]
    fn filter_rejects_cheaply_for_hard_targets() {
        let tester = TargetTester::new(Target([u32::MAX, u32::MAX, 0, 0, 0, 0, 0, 0]));
        assert!(!tester.passes_filter(&digest_with([0, 0, 0, 0, 0, 0, 0, 1])));
        assert!(tester.test(&digest_with([0, 0, 0, 0, 0, 0, 0, 0])));
    }

    #[test]
    fn easy_targets_still_scan() {
        let tester = TargetTester::new(target_with_top(0x2000_0000));
        assert_eq!(tester.mask(), 0);
        assert!(tester.test(&digest_with([0, 0, 0, 0, 0, 0, 0, 0x1FFF_FFFF])));
        assert!(!tester.test(&digest_with([0, 0, 0, 0, 0, 0, 0, 0x2000_0001])));
    }
}
