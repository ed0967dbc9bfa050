// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A seeded-PRNG responder, optionally tracked in a [`crate::tree::PickTree`]
//! to reduce duplicate playouts in small search spaces (`spec.md` §4.3).

use super::PickResponder;
use crate::pick::{PickRequest, Reply};
use crate::tree::PickTree;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Draws replies from a seeded PRNG. Has no backtracking: `start_at(d)`
/// returns `d == depth`, matching `spec.md` §4.1 ("no backtracking
/// available").
pub struct Random {
    rng: StdRng,
    depth: usize,
    tracker: Option<PickTree>,
    path: Vec<Reply>,
}

impl Random {
    /// Creates a responder seeded from `seed`, with no tracking.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            depth: 0,
            tracker: None,
            path: Vec::new(),
        }
    }

    /// Creates a responder seeded from `seed` that also records completed
    /// playouts into a [`PickTree`] so it can avoid resampling them. Only
    /// useful for small search spaces; the caller decides when tracking is
    /// worth the bookkeeping (`spec.md` §4.3's tracking-threshold heuristic
    /// lives in [`crate::config::Config::should_track`], since it's a
    /// policy choice over this mechanism, not part of the mechanism
    /// itself).
    ///
    /// Tracking only helps if this same instance is reused across many
    /// playouts, calling [`Self::finish_playout`] between each — a single
    /// one-off `Random::tracked` is no better than `Random::new`.
    /// [`crate::playouts::RandomPlayouts`] mints a fresh, independent
    /// responder per playout and so always uses untracked `Random`;
    /// building a tracked loop is left to the caller.
    #[must_use]
    pub fn tracked(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            depth: 0,
            tracker: Some(PickTree::new()),
            path: Vec::new(),
        }
    }

    /// Marks the current playout as complete, pruning it from the tracker
    /// (if tracking is enabled) so a future sample won't repeat it exactly.
    pub fn finish_playout(&mut self) {
        if let Some(tree) = &mut self.tracker {
            tree.prune(&self.path);
        }
        self.path.clear();
        self.depth = 0;
    }

    fn sample(rng: &mut StdRng, req: &PickRequest) -> Reply {
        match req.bias() {
            Some(bias) => bias(rng as &mut dyn RngCore),
            None => rng.random_range(req.min()..=req.max()),
        }
    }
}

impl PickResponder for Random {
    fn next_pick(&mut self, req: &PickRequest) -> Option<Reply> {
        let reply = match &mut self.tracker {
            Some(tree) => {
                let mut walk = tree.walk();
                for &key in &self.path {
                    walk.push(&req.clone(), key).ok();
                }
                let narrowed = walk.narrow(req);
                if narrowed.min() > narrowed.max() {
                    return None;
                }
                // `narrow` only accounts for pruning that has coalesced down
                // from the low end (`live_min`); a random sampler can also
                // land on an interior branch pruned out of order, so retry a
                // bounded number of times before falling back to the
                // deterministic "first unpruned branch" search.
                let max_attempts = narrowed.size().min(32) as u32;
                let mut sampled = Self::sample(&mut self.rng, &narrowed);
                let mut attempts = 0u32;
                while walk.is_pruned(sampled) && attempts < max_attempts {
                    sampled = Self::sample(&mut self.rng, &narrowed);
                    attempts += 1;
                }
                let sampled = if walk.is_pruned(sampled) {
                    walk.push_unpruned(narrowed.min(), req)?
                } else {
                    walk.push(req, sampled).ok();
                    sampled
                };
                drop(walk);
                self.path.push(sampled);
                sampled
            }
            None => Self::sample(&mut self.rng, req),
        };
        self.depth += 1;
        Some(reply)
    }

    fn start_at(&mut self, depth: usize) -> bool {
        depth == self.depth
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
