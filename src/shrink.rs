// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Shrinker`]: drives a failing [`CallLog`] toward a smaller failing one
//! by deleting contiguous ranges of picks and bisecting individual picks
//! toward their minimum (`spec.md` §4.8).

use crate::call::CallLog;
use crate::dispatch::PickFunction;
use crate::gen::Gen;
use crate::pick::{PickRequest, Reply};
use crate::responder::Playback;
use crate::script::Script;

/// Shrinks a failing `(script, log)` pair toward a smaller failing one.
///
/// Operates directly on the flat reply stream rather than on [`Call`]
/// boundaries: a contiguous range deletion at the size of a single call's
/// group is exactly "delete that group", and at size 1 is exactly "snip
/// one pick", so one range-deletion routine covers both without needing to
/// track group boundaries across edits. Each accepted edit is verified by
/// actually replaying the script and re-checking `is_failing`, so a change
/// that alters downstream control flow (a deleted gate pick shifting what
/// the rest of the stream means) is only kept if the result still fails.
pub struct Shrinker<'a, T> {
    script: Script<T>,
    is_failing: &'a dyn Fn(&T) -> bool,
}

impl<'a, T: 'static> Shrinker<'a, T> {
    /// Creates a shrinker for `script`, using `is_failing` to re-check the
    /// property on each candidate rebuild.
    #[must_use]
    pub fn new(script: Script<T>, is_failing: &'a dyn Fn(&T) -> bool) -> Self {
        Self { script, is_failing }
    }

    /// Shrinks `log`'s failing value toward a smaller failing one.
    ///
    /// # Panics
    ///
    /// Panics if `log` doesn't replay to a value, or replays to a value
    /// that doesn't satisfy `is_failing` — both are caller errors, since a
    /// `Shrinker` can only be asked to shrink an input that already fails.
    pub fn run(&self, log: &CallLog) -> Gen<T> {
        let mut picks = log.replies();
        let (mut value, mut current_log) = self
            .rebuild(picks.clone())
            .expect("shrink input log must replay to a value");
        assert!(
            (self.is_failing)(&value),
            "shrink input must already be a failing value"
        );

        loop {
            let mut improved = self.shrink_by_deletion(&mut picks, &mut value, &mut current_log);
            improved |= self.shrink_by_replacement(&mut picks, &mut value, &mut current_log);
            if !improved {
                break;
            }
        }

        let reply_list = current_log.replies();
        Gen::new(self.script.clone(), reply_list, current_log, value)
    }

    fn rebuild(&self, picks: Vec<Reply>) -> Option<(T, CallLog)> {
        let mut responder = Playback::new(picks);
        let mut pick = PickFunction::new(&mut responder);
        let value = pick.dispatch(&self.script).ok()?;
        let log = pick.into_log().into_log();
        Some((value, log))
    }

    /// Tries removing contiguous ranges of picks, from roughly half the
    /// stream down to single picks, keeping any deletion that still fails.
    fn shrink_by_deletion(
        &self,
        picks: &mut Vec<Reply>,
        value: &mut T,
        current_log: &mut CallLog,
    ) -> bool {
        let mut improved_any = false;
        let mut size = picks.len();
        while size > 0 {
            let mut start = 0;
            loop {
                if start + size > picks.len() {
                    break;
                }
                let mut candidate = picks.clone();
                candidate.drain(start..start + size);
                match self.rebuild(candidate.clone()) {
                    Some((candidate_value, candidate_log)) if (self.is_failing)(&candidate_value) => {
                        *picks = candidate;
                        *value = candidate_value;
                        *current_log = candidate_log;
                        improved_any = true;
                        // Retry at the same `start` against the now-shorter stream.
                    }
                    _ => start += 1,
                }
            }
            size /= 2;
        }
        improved_any
    }

    /// Bisects each remaining pick toward its request's minimum, keeping
    /// any replacement that still fails.
    fn shrink_by_replacement(
        &self,
        picks: &mut Vec<Reply>,
        value: &mut T,
        current_log: &mut CallLog,
    ) -> bool {
        let mut improved_any = false;
        let mut i = 0;
        loop {
            let requests: Vec<PickRequest> = current_log
                .calls()
                .iter()
                .flat_map(|c| c.group().requests().iter().cloned())
                .collect();
            if i >= picks.len() || i >= requests.len() {
                break;
            }
            let req = requests[i].clone();
            let mut low = req.min();
            let mut high = picks[i];
            while low < high {
                let mid = low + (high - low) / 2;
                let mut candidate = picks.clone();
                candidate[i] = mid;
                match self.rebuild(candidate.clone()) {
                    Some((candidate_value, candidate_log)) if (self.is_failing)(&candidate_value) => {
                        high = mid;
                        *picks = candidate;
                        *value = candidate_value;
                        *current_log = candidate_log;
                        improved_any = true;
                    }
                    _ => low = mid + 1,
                }
            }
            i += 1;
        }
        improved_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::PickFunction;
    use crate::script::Script;
    use test_log::test;

    fn log_for<T: 'static>(script: &Script<T>, replies: Vec<i32>) -> CallLog {
        let mut responder = Playback::new(replies);
        let mut pick = PickFunction::new(&mut responder);
        pick.dispatch(script).unwrap();
        pick.into_log().into_log()
    }

    #[test]
    fn shrinks_a_single_int_toward_its_failing_threshold() {
        let script = Script::make(
            "n",
            |pick| pick.pick(PickRequest::must(0, 100)),
            crate::script::ScriptOpts::default(),
        );
        let log = log_for(&script, vec![77]);
        let is_failing = |v: &i32| *v >= 10;
        let shrunk = Shrinker::new(script, &is_failing).run(&log);
        assert_eq!(*shrunk.value(), 10);
    }

    #[test]
    fn shrinks_a_variable_length_array_toward_the_empty_failing_case() {
        let bit = crate::domain::int("bit", 0, 1).unwrap();
        let array = crate::domain::array("bits", bit, 0, 6).unwrap();
        let log = log_for(array.build(), vec![1, 1, 1, 1, 1, 1, 1, 1]);
        let is_failing = |v: &Vec<i32>| v.len() >= 2;
        let shrunk = Shrinker::new(array.build().clone(), &is_failing).run(&log);
        assert_eq!(shrunk.value().len(), 2);
    }

    #[test]
    fn already_minimal_input_is_unchanged() {
        let script = Script::make(
            "n",
            |pick| pick.pick(PickRequest::must(0, 100)),
            crate::script::ScriptOpts::default(),
        );
        let log = log_for(&script, vec![0]);
        let is_failing = |v: &i32| *v >= 0;
        let shrunk = Shrinker::new(script, &is_failing).run(&log);
        assert_eq!(*shrunk.value(), 0);
    }
}
