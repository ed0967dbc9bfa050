// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A pick-sequence substrate for property-based generation: a dispatcher
//! that turns bounded integer requests into values, a search tree that
//! enumerates playouts without revisiting pruned branches, a structured
//! call log that can be edited and replayed to shrink a failing value, and
//! an invertible [`Domain`] layer for round-tripping and uniqueness.

pub mod call;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod gen;
pub mod generators;
pub mod jar;
pub mod pick;
pub mod playouts;
pub mod responder;
pub mod script;
pub mod shrink;
pub mod tree;

pub use call::{Call, CallArg, CallBuffer, CallLog, GroupEdit, RunOutcome};
pub use config::Config;
pub use dispatch::{Filtered, PickFunction};
pub use domain::Domain;
pub use error::{ParseError, PickError, PickResult, SendErr};
pub use gen::Gen;
pub use jar::{Jar, RowJar};
pub use pick::{PickList, PickRequest, Reply};
pub use playouts::{OrderedPlayouts, RandomPlayouts};
pub use responder::{EditResponder, Playback, PickResponder, Random, TreeWalking};
pub use script::{Script, ScriptId, ScriptOpts};

/// An opaque reproduction handle: a seed paired with the playout index it
/// produced, meaningful only to the driver that minted it (`spec.md` §6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RepKey {
    pub seed: u64,
    pub index: u64,
}

impl RepKey {
    /// Creates a reproduction handle from a seed and playout index.
    #[must_use]
    pub fn new(seed: u64, index: u64) -> Self {
        Self { seed, index }
    }
}

impl std::fmt::Display for RepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.seed, self.index)
    }
}

/// Builds one value from `script` against `responder`, returning `None` if
/// the top-level dispatch is filtered (`spec.md` §6).
pub fn generate<T: 'static>(
    script: &Script<T>,
    responder: &mut dyn PickResponder,
    config: &Config,
) -> Option<Gen<T>> {
    let mut pick = PickFunction::new(responder).with_max_tries(config.max_tries);
    let value = pick.dispatch(script).ok()?;
    let log = pick.into_log().into_log();
    let reply_list = log.replies();
    Some(Gen::new(script.clone(), reply_list, log, value))
}

/// An iterator over seeded random responders, one per playout.
pub fn random_playouts(seed: u64) -> RandomPlayouts {
    RandomPlayouts::new(seed)
}

/// An iterator over tree-walking responders enumerating every playout of a
/// finite script exactly once, via iterative deepening.
pub fn ordered_playouts(limit: Option<u32>) -> OrderedPlayouts {
    OrderedPlayouts::new(limit)
}

/// Shrinks a failing `(script, log, value)` toward a smaller failing one,
/// per `spec.md` §4.8. `is_failing` re-checks the property on a rebuilt
/// value.
pub fn shrink<T: 'static + Clone>(
    script: &Script<T>,
    log: &CallLog,
    is_failing: &dyn Fn(&T) -> bool,
) -> Gen<T> {
    shrink::Shrinker::new(script.clone(), is_failing).run(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use responder::Random as RandomResponder;
    use test_log::test;

    #[test]
    fn generate_builds_a_value() {
        let script = Script::of("digits", vec![1, 2, 3]).unwrap();
        let mut responder = RandomResponder::new(1);
        let gen = generate(&script, &mut responder, &Config::default()).unwrap();
        assert!([1, 2, 3].contains(gen.value()));
    }
}
