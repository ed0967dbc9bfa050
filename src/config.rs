// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Tunables governing retry budgets and the random-with-tracking heuristic
//! (`spec.md` §4.2, §4.3, §9).

/// Builder-style configuration for [`crate::generate`] and the pieces it
/// wires together. Construct with [`Config::default`] and override fields
/// through the builder methods.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bounds `PickFunction::dispatch_accepting`'s retry loop.
    pub max_tries: u32,

    /// Size of the "start region" in the two-coin array-length bias
    /// (`spec.md` §9 "Open questions").
    pub start_region_size: u32,

    /// Floor below which a biased coin is treated as deterministic rather
    /// than sampled, to avoid degenerate near-zero/near-one thresholds.
    pub min_probability: f64,

    /// Probability-of-revisit threshold below which `Random::tracked` is
    /// skipped in favor of plain `Random` (`spec.md` §4.3).
    pub tracking_threshold: f64,

    /// Growth factor applied to a Jar's accept-retry budget as it empties
    /// (`spec.md` §4.7).
    pub accept_retry_growth: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tries: 1000,
            start_region_size: 8,
            min_probability: 1e-6,
            tracking_threshold: 1e-3,
            accept_retry_growth: 1.5,
        }
    }
}

impl Config {
    /// Overrides `max_tries`.
    #[must_use]
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Overrides `start_region_size`.
    #[must_use]
    pub fn with_start_region_size(mut self, size: u32) -> Self {
        self.start_region_size = size;
        self
    }

    /// Overrides `min_probability`.
    #[must_use]
    pub fn with_min_probability(mut self, p: f64) -> Self {
        self.min_probability = p;
        self
    }

    /// Overrides `tracking_threshold`.
    #[must_use]
    pub fn with_tracking_threshold(mut self, p: f64) -> Self {
        self.tracking_threshold = p;
        self
    }

    /// Overrides `accept_retry_growth`.
    #[must_use]
    pub fn with_accept_retry_growth(mut self, factor: f64) -> Self {
        self.accept_retry_growth = factor;
        self
    }

    /// Whether tracking is worth it for `remaining_samples` draws from a
    /// space with `branch_count` live branches at the current node
    /// (`spec.md` §4.3 "Random with tracking").
    ///
    /// This is a policy hook, not something this crate's own drivers call
    /// automatically: tracking only pays off when the *same* [`crate::responder::Random`]
    /// instance is reused across many playouts (so its tree accumulates
    /// what's already been visited), and deciding whether to do that — and
    /// estimating `branch_count`/`remaining_samples` for a given script — is
    /// a caller-level choice. [`crate::playouts::RandomPlayouts`] mints an
    /// independent responder per playout and so never benefits from
    /// tracking; callers who want it should consult this method themselves
    /// and drive a single [`crate::responder::Random::tracked`] instance
    /// directly, calling `finish_playout` between playouts.
    #[must_use]
    pub fn should_track(&self, branch_count: u64, remaining_samples: u64) -> bool {
        if branch_count == 0 {
            return false;
        }
        let revisit_probability = remaining_samples as f64 / branch_count as f64;
        revisit_probability >= self.tracking_threshold
    }
}
