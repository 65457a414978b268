// src/miner/scanner.rs
//! Nonce scanner
//!
//! Walks a work item's nonce range in ascending order, hashing each
//! candidate with the calling thread's context and testing the digest
//! against the target. Returns on the first share, on range exhaustion, or
//! when the restart signal is seen after a tested candidate.
//!
//! `hashes_done` counts candidates actually tested, so the reported rate is
//! exact in all three outcomes. Batched contexts hash a whole batch before
//! any lane is tested, but lanes are still tested and the restart signal
//! polled one candidate at a time in nonce order. A share or a restart in an
//! early lane leaves the later lanes of that batch hashed but untested and
//! uncounted.

use crate::miner::algorithm::HashContext;
use crate::miner::job::WorkItem;
use crate::miner::restart::WorkRestart;
use crate::types::{HEADER_LEN, Hash256, NONCE_OFFSET};

/// How a scan call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// `nonce` produced a digest at or below the target
    Found {
        /// Winning nonce
        nonce: u32,
        /// Its digest
        hash: Hash256,
    },
    /// Every nonce in the range was tested without a share
    Exhausted,
    /// The restart signal was raised mid-range
    Cancelled,
}

/// Outcome plus the number of candidates tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    /// How the scan ended
    pub outcome: ScanOutcome,
    /// Candidates hashed and tested by this call
    pub hashes_done: u64,
}

impl ScanResult {
    /// The winning nonce, if any
    pub fn nonce(&self) -> Option<u32> {
        match self.outcome {
            ScanOutcome::Found { nonce, .. } => Some(nonce),
            _ => None,
        }
    }

    /// Nonce the next scan of the same range should start from
    ///
    /// `None` when the range is finished or the scan was cancelled.
    pub fn resume_from(&self) -> Option<u64> {
        self.nonce().map(|n| u64::from(n) + 1)
    }
}

#[inline]
fn set_nonce(header: &mut [u8; HEADER_LEN], nonce: u64) {
    header[NONCE_OFFSET..].copy_from_slice(&(nonce as u32).to_be_bytes());
}

/// Scans `work` with the calling thread's context
///
/// # Arguments
/// * `thr_id` - Worker index, for logging
/// * `work` - Job, tester and `[first_nonce, max_nonce)`
/// * `ctx` - Context already prepared for `work.job`
/// * `restart` - Polled after every tested candidate
///
/// # Returns
/// The outcome and the number of candidates tested
pub fn scan(thr_id: usize, work: &WorkItem, ctx: &mut dyn HashContext, restart: &WorkRestart) -> ScanResult {
    let lanes = ctx.lanes().max(1);
    let result = if lanes == 1 {
        scan_single(work, ctx, restart)
    } else {
        scan_batched(work, ctx, restart, lanes)
    };

    log::trace!(
        "[{}] scanned {:#x}..{:#x}: {:?} after {} hashes",
        thr_id,
        work.first_nonce,
        work.max_nonce,
        result.outcome,
        result.hashes_done
    );
    result
}

fn scan_single(work: &WorkItem, ctx: &mut dyn HashContext, restart: &WorkRestart) -> ScanResult {
    let first = u64::from(work.first_nonce);
    let mut header = work.job.header_bytes();
    let mut hash = [0u8; 32];

    let mut n = first;
    while n < work.max_nonce {
        set_nonce(&mut header, n);
        ctx.hash(&header, &mut hash);

        if work.tester.test(&hash) {
            return ScanResult {
                outcome: ScanOutcome::Found { nonce: n as u32, hash },
                hashes_done: n - first + 1,
            };
        }
        if restart.is_raised() {
            return ScanResult {
                outcome: ScanOutcome::Cancelled,
                hashes_done: n - first + 1,
            };
        }
        n += 1;
    }

    ScanResult {
        outcome: ScanOutcome::Exhausted,
        hashes_done: work.max_nonce - first,
    }
}

fn scan_batched(work: &WorkItem, ctx: &mut dyn HashContext, restart: &WorkRestart, lanes: usize) -> ScanResult {
    let first = u64::from(work.first_nonce);
    let mut headers = vec![work.job.header_bytes(); lanes];
    let mut hashes = vec![[0u8; 32]; lanes];

    let mut n = first;
    while n < work.max_nonce {
        // the final batch may be short
        let batch = (work.max_nonce - n).min(lanes as u64) as usize;
        for (i, header) in headers[..batch].iter_mut().enumerate() {
            set_nonce(header, n + i as u64);
        }
        ctx.hash_lanes(&headers[..batch], &mut hashes[..batch]);

        for (i, hash) in hashes[..batch].iter().enumerate() {
            let nonce = n + i as u64;
            if work.tester.test(hash) {
                return ScanResult {
                    outcome: ScanOutcome::Found {
                        nonce: nonce as u32,
                        hash: *hash,
                    },
                    hashes_done: nonce - first + 1,
                };
            }
            if restart.is_raised() {
                return ScanResult {
                    outcome: ScanOutcome::Cancelled,
                    hashes_done: nonce - first + 1,
                };
            }
        }
        n += batch as u64;
    }

    ScanResult {
        outcome: ScanOutcome::Exhausted,
        hashes_done: work.max_nonce - first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::job::Job;
    use crate::miner::target::MaskTable;
    use crate::types::{NONCE_SPACE, Target};
    use std::sync::Arc;

    /// Digest top word is the nonce (or its complement); everything else zero
    struct NonceEcho {
        lanes: usize,
        calls: Vec<usize>,
        descending: bool,
    }

    impl HashContext for NonceEcho {
        fn hash(&mut self, header: &[u8; HEADER_LEN], out: &mut Hash256) {
            let nonce = u32::from_be_bytes([header[76], header[77], header[78], header[79]]);
            let top = if self.descending { !nonce } else { nonce };
            *out = [0u8; 32];
            out[28..].copy_from_slice(&top.to_le_bytes());
        }

        fn lanes(&self) -> usize {
            self.lanes
        }

        fn hash_lanes(&mut self, headers: &[[u8; HEADER_LEN]], out: &mut [Hash256]) {
            self.calls.push(headers.len());
            for (h, o) in headers.iter().zip(out.iter_mut()) {
                self.hash(h, o);
            }
        }
    }

    fn echo(lanes: usize) -> NonceEcho {
        NonceEcho {
            lanes,
            calls: vec![],
            descending: false,
        }
    }

    fn work(top: u32, first: u32, max: u64) -> WorkItem {
        let mut target = [u32::MAX; 8];
        target[7] = top;
        let job = Arc::new(Job::new("t", [0; 20], Target(target)));
        WorkItem::new(job, &MaskTable::default(), first, max).unwrap()
    }

    #[test]
    fn finds_first_nonce_under_target() {
        // digests equal to their nonce; target 100 accepts nonce 100 first
        let result = scan(0, &work(100, 100, 200), &mut echo(1), &WorkRestart::new());
        assert_eq!(result.nonce(), Some(100));
        assert_eq!(result.hashes_done, 1);
        assert_eq!(result.resume_from(), Some(101));
    }

    #[test]
    fn exhausts_range_without_share() {
        let result = scan(0, &work(5, 10, 20), &mut echo(1), &WorkRestart::new());
        assert_eq!(result.outcome, ScanOutcome::Exhausted);
        assert_eq!(result.hashes_done, 10);
        assert_eq!(result.resume_from(), None);
    }

    #[test]
    fn empty_range_hashes_nothing() {
        let result = scan(0, &work(u32::MAX, 7, 7), &mut echo(1), &WorkRestart::new());
        assert_eq!(result.outcome, ScanOutcome::Exhausted);
        assert_eq!(result.hashes_done, 0);
    }

    #[test]
    fn raised_signal_stops_after_one_candidate() {
        let restart = WorkRestart::new();
        restart.raise();
        let result = scan(0, &work(0, 1, 1000), &mut echo(1), &restart);
        assert_eq!(result.outcome, ScanOutcome::Cancelled);
        assert_eq!(result.hashes_done, 1);
    }

    #[test]
    fn share_wins_over_pending_restart() {
        let restart = WorkRestart::new();
        restart.raise();
        let result = scan(0, &work(u32::MAX, 3, 10), &mut echo(1), &restart);
        assert_eq!(result.nonce(), Some(3));
    }

    #[test]
    fn top_of_nonce_space() {
        let result = scan(0, &work(u32::MAX, u32::MAX - 1, NONCE_SPACE), &mut echo(1), &WorkRestart::new());
        assert_eq!(result.nonce(), Some(u32::MAX - 1));

        let result = scan(0, &work(0, u32::MAX - 1, NONCE_SPACE), &mut echo(1), &WorkRestart::new());
        assert_eq!(result.outcome, ScanOutcome::Exhausted);
        assert_eq!(result.hashes_done, 2);
    }

    #[test]
    fn batched_scan_handles_partial_batch() {
        let mut ctx = echo(4);
        let result = scan(0, &work(0, 1, 11), &mut ctx, &WorkRestart::new());
        assert_eq!(result.outcome, ScanOutcome::Exhausted);
        assert_eq!(result.hashes_done, 10);
        assert_eq!(ctx.calls, vec![4, 4, 2]);
    }

    #[test]
    fn batched_scan_reports_lane_position() {
        // nonces 20..=23 share a batch; 22 is the first under the target
        let mut ctx = echo(4);
        ctx.descending = true;
        let result = scan(0, &work(!22, 20, 40), &mut ctx, &WorkRestart::new());
        assert_eq!(result.nonce(), Some(22));
        assert_eq!(result.hashes_done, 3);
    }

    #[test]
    fn batched_cancel_counts_tested_candidates() {
        // the first batch is hashed in full, but only lane 0 is tested
        let restart = WorkRestart::new();
        restart.raise();
        let mut ctx = echo(4);
        let result = scan(0, &work(0, 8, 100), &mut ctx, &restart);
        assert_eq!(result.outcome, ScanOutcome::Cancelled);
        assert_eq!(result.hashes_done, 1);
        assert_eq!(ctx.calls, vec![4]);
    }
}
