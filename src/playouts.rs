// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Enumerating playouts: [`OrderedPlayouts`] drives a single shared
//! [`crate::tree::PickTree`] to exhaustion so every playout is visited
//! exactly once; [`RandomPlayouts`] yields an unbounded stream of
//! independently-seeded random responders (`spec.md` §4.3, §6).

use crate::responder::{PickResponder, Random, TreeWalking};

/// Enumerates every playout of a finite search space exactly once.
///
/// Unlike a plain [`Iterator`], each playout must actually be *driven*
/// (dispatched against a script) before the next one can be produced,
/// since the tree needs to know how deep the previous playout went before
/// it can retire it and find the next unpruned branch. Call
/// [`Self::next_playout`] to get the responder for the next playout; drive
/// it to completion, then call it again.
///
/// Any total order that starts with the all-minima playout satisfies
/// `spec.md` §8's enumeration scenarios; this implementation retires each
/// finished playout by backtracking from its last pick toward the root,
/// which is a stable, if unremarkable, depth-first order.
pub struct OrderedPlayouts {
    walker: TreeWalking,
    limit: Option<u32>,
    produced: u32,
    started: bool,
    exhausted: bool,
}

impl OrderedPlayouts {
    /// Creates an enumerator, optionally capped at `limit` playouts.
    #[must_use]
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            walker: TreeWalking::new(),
            limit,
            produced: 0,
            started: false,
            exhausted: false,
        }
    }

    /// Returns the responder for the next playout, or `None` if every
    /// playout has been produced (or `limit` was reached).
    pub fn next_playout(&mut self) -> Option<&mut TreeWalking> {
        if self.exhausted {
            return None;
        }
        if let Some(limit) = self.limit {
            if self.produced >= limit {
                return None;
            }
        }
        if self.started {
            // `start_at(depth)` retries by dropping everything after
            // `depth`; retrying the exact depth just finished would just
            // re-check the leaf we're about to prune, which always fails.
            // Start one level up, backing off further while each level's
            // last branch turns out to be exhausted too.
            if self.walker.depth() == 0 {
                self.exhausted = true;
                return None;
            }
            let mut depth = self.walker.depth() - 1;
            loop {
                if self.walker.start_at(depth) {
                    break;
                }
                if depth == 0 {
                    self.exhausted = true;
                    return None;
                }
                depth -= 1;
            }
        }
        self.started = true;
        self.produced += 1;
        Some(&mut self.walker)
    }

    /// Whether every playout reachable from the root has been produced.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.walker.is_exhausted()
    }
}

/// An unbounded stream of independently-seeded [`Random`] responders, one
/// per playout.
///
/// Each responder is freshly minted and discarded after one playout, so
/// this never uses `Random::tracked`: tracking only pays off when a single
/// instance accumulates visited playouts across many draws, which an
/// independent-per-item stream can't do. A caller that wants tracking
/// (per `Config::should_track`) drives one `Random::tracked` directly
/// instead of going through this stream.
pub struct RandomPlayouts {
    seed: u64,
    index: u64,
}

impl RandomPlayouts {
    /// Creates a stream of random responders derived from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed, index: 0 }
    }
}

impl Iterator for RandomPlayouts {
    type Item = Random;

    fn next(&mut self) -> Option<Random> {
        // Splitmix64-style derivation: cheap, well-distributed, and
        // deterministic for a given (seed, index) pair.
        let mut z = self.seed.wrapping_add(self.index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.index += 1;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        Some(Random::new(z))
    }
}
