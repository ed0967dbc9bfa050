// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Jar<T>`]: a distinct-value sampler composing a [`Domain`] with a
//! [`PickTree`], and [`RowJar`], its specialization for table rows with a
//! uniquely-keyed column (`spec.md` §4.7).

use crate::config::Config;
use crate::dispatch::PickFunction;
use crate::domain::Domain;
use crate::gen::Gen;
use crate::responder::{PickResponder, TreeWalking};
use std::rc::Rc;

/// A mutable set that yields distinct canonical encodings from a [`Domain`],
/// one per [`Self::take`], by walking a private [`PickTree`] that always
/// chooses the smallest unpruned branch and pruning each taken leaf as it
/// goes.
///
/// This always draws in ascending canonical order rather than choosing
/// randomly among the remaining encodings — a deterministic, simpler
/// reading of `spec.md` §4.7's "narrows each outgoing PickRequest to the
/// unpruned range" that still gives the two invariants that matter: no
/// value is ever taken twice, and a domain with `card(d) = N` permits
/// exactly `N` takes before `is_empty()`.
pub struct Jar<T> {
    domain: Domain<T>,
    walker: TreeWalking,
    taken: usize,
    config: Config,
}

impl<T: 'static> Jar<T> {
    /// Creates an empty jar over `domain`, with default retry tunables.
    #[must_use]
    pub fn new(domain: Domain<T>) -> Self {
        Self {
            domain,
            walker: TreeWalking::new(),
            taken: 0,
            config: Config::default(),
        }
    }

    /// Overrides the retry tunables (`spec.md` §4.7's accept-retry growth)
    /// used by [`Self::peek`]/[`Self::take`].
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Number of values already taken.
    #[must_use]
    pub fn taken(&self) -> usize {
        self.taken
    }

    /// Whether every distinct encoding has already been taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.walker.is_exhausted()
    }

    /// The accept-retry budget for the next build: grows multiplicatively
    /// with `taken` (`config.accept_retry_growth`) so a domain whose build
    /// rejects via `dispatch_accepting` (e.g. `unique_array`, `table`) gets
    /// more attempts to find an unpruned, non-colliding playout as the jar
    /// empties and collisions become more likely (`spec.md` §4.7).
    fn current_max_tries(&self) -> u32 {
        let scaled =
            self.config.max_tries as f64 * self.config.accept_retry_growth.powi(self.taken as i32);
        scaled.min(f64::from(u32::MAX)) as u32
    }

    /// The value [`Self::take`] would produce next, without committing it.
    /// Calling `peek` again without an intervening `take` returns the same
    /// value.
    pub fn peek(&mut self) -> Option<Gen<T>> {
        if self.is_empty() {
            return None;
        }
        self.walker.rewind();
        let max_tries = self.current_max_tries();
        let mut pick = PickFunction::new(&mut self.walker).with_max_tries(max_tries);
        let value = pick.dispatch(self.domain.build()).ok()?;
        let log = pick.into_log().into_log();
        let reply_list = log.replies();
        Some(Gen::new(self.domain.build().clone(), reply_list, log, value))
    }

    /// Takes the next distinct value, pruning its encoding from the jar so
    /// it's never produced again.
    pub fn take(&mut self) -> Option<Gen<T>> {
        let gen = self.peek()?;
        self.walker.start_at(0);
        self.taken += 1;
        Some(gen)
    }
}

/// A [`Jar`] specialized to drawing rows one at a time with a unique key
/// column, rather than a fixed-`length` table all at once (`spec.md` §4.7,
/// §8 scenario 6's "Table behaves the same [as `unique_array`] with
/// per-column uniqueness tracked via per-key PickTree").
///
/// Draws distinct row encodings from the underlying row [`Jar`], further
/// skipping any row whose `key` collides with one already taken. This is a
/// simpler reading of the per-key tracking than a dedicated per-key
/// `PickTree`: since the row jar already never repeats a row encoding, the
/// only extra bookkeeping `RowJar` needs is a set of taken keys.
pub struct RowJar<Row> {
    rows: Jar<Row>,
    key: Rc<dyn Fn(&Row) -> i32>,
    seen_keys: std::collections::HashSet<i32>,
}

impl<Row: 'static> RowJar<Row> {
    /// Creates a row jar over `row`, keyed by `key`.
    #[must_use]
    pub fn new(row: Domain<Row>, key: impl Fn(&Row) -> i32 + 'static) -> Self {
        Self {
            rows: Jar::new(row),
            key: Rc::new(key),
            seen_keys: std::collections::HashSet::new(),
        }
    }

    /// Overrides the underlying row jar's retry tunables.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.rows = self.rows.with_config(config);
        self
    }

    /// Takes the next row with a fresh key, or `None` once the underlying
    /// row jar is exhausted.
    pub fn take(&mut self) -> Option<Gen<Row>> {
        loop {
            let gen = self.rows.take()?;
            if self.seen_keys.insert((self.key)(gen.value())) {
                return Some(gen);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::int;
    use test_log::test;

    #[test]
    fn no_duplicate_jar_permits_exactly_cardinality_takes() {
        let d = int("n", 0, 2).unwrap();
        let mut jar = Jar::new(d);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            assert!(!jar.is_empty());
            let gen = jar.take().unwrap();
            assert!(seen.insert(*gen.value()));
        }
        assert!(jar.is_empty());
        assert!(jar.take().is_none());
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn peek_is_stable_until_take() {
        let d = int("n", 0, 2).unwrap();
        let mut jar = Jar::new(d);
        let first = *jar.peek().unwrap().value();
        let second = *jar.peek().unwrap().value();
        assert_eq!(first, second);
        let taken = *jar.take().unwrap().value();
        assert_eq!(taken, first);
    }

    #[test]
    fn repeated_peek_is_stable_past_the_jars_starting_value() {
        // Regression: a non-minimal first value (one that needs more than
        // one pick) used to make a second `peek` diverge, since the walk's
        // replay cursor wasn't reset between calls and so treated the first
        // peek's picks as already consumed instead of replaying them.
        let bit = int("bit", 0, 1).unwrap();
        let d = crate::domain::array("bits", bit, 0, 4).unwrap();
        let mut jar = Jar::new(d);
        jar.take().unwrap(); // retire the all-minimum (empty) encoding
        let first = jar.peek().unwrap();
        let second = jar.peek().unwrap();
        assert_eq!(first.reply_list(), second.reply_list());
        assert_eq!(*first.value(), *second.value());
    }

    #[test]
    fn accept_retry_budget_grows_as_the_jar_empties() {
        let cfg = Config::default().with_max_tries(2).with_accept_retry_growth(4.0);
        let jar: Jar<i32> = Jar::new(int("n", 0, 9).unwrap()).with_config(cfg);
        assert_eq!(jar.current_max_tries(), 2);
        let jar = Jar {
            taken: 3,
            ..jar
        };
        assert_eq!(jar.current_max_tries(), (2.0 * 4.0_f64.powi(3)) as u32);
    }

    #[test]
    fn row_jar_tracks_key_uniqueness() {
        // Two rows with the same key value ([`int`] of range 0..=0 can only
        // ever draw 0), so a key on `id % 2` collapses every even `id` into
        // one slot: the jar still enumerates every distinct `id` internally,
        // but only the first row per key value is ever returned.
        let id = int("id", 0, 3).unwrap();
        let mut jar = RowJar::new(id, |id: &i32| id % 2);
        let first = jar.take().unwrap();
        let second = jar.take().unwrap();
        assert_ne!(first.value() % 2, second.value() % 2);
        assert!(jar.take().is_none());
    }

    #[test]
    fn row_jar_with_fully_distinct_keys_drains_the_whole_domain() {
        let id = int("id", 1, 3).unwrap();
        let mut jar = RowJar::new(id, |id: &i32| *id);
        let mut ids = Vec::new();
        while let Some(g) = jar.take() {
            ids.push(*g.value());
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
