// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`PickFunction`]: runs a [`crate::script::Script`] against a
//! [`crate::responder::PickResponder`], retrying on [`Filtered`] and
//! recording a [`crate::call::CallBuffer`] as it goes (`spec.md` §4.2).

use crate::call::CallBuffer;
use crate::pick::{PickRequest, Reply};
use crate::responder::PickResponder;
use crate::script::Script;
use std::rc::Rc;

/// A recoverable rejection: no reply fit a request, or a build / accept
/// predicate rejected its picks. Never surfaces to user code (`spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filtered;

/// Drives one build (or one enumeration step) of a [`Script`] against a
/// [`PickResponder`], handling depth limiting, retry-on-filter, and call
/// logging.
///
/// `level` tracks nesting: it is `-1` outside of any script's build, and
/// `0` while directly inside the build of whichever script started this
/// dispatch chain. Only picks and sub-dispatches made while `level == 0`
/// become their own [`crate::call::Call`] entries; anything deeper is
/// folded into the enclosing level-0 call's group (`spec.md` §4.2, §4.4).
pub struct PickFunction<'a> {
    responder: &'a mut dyn PickResponder,
    depth_limit: Option<usize>,
    level: i32,
    max_tries: u32,
    log: CallBuffer,
}

const DEFAULT_MAX_TRIES: u32 = 1000;

impl<'a> PickFunction<'a> {
    /// Creates a dispatcher over `responder` with no depth limit and the
    /// default `max_tries` (1000).
    pub fn new(responder: &'a mut dyn PickResponder) -> Self {
        Self {
            responder,
            depth_limit: None,
            level: -1,
            max_tries: DEFAULT_MAX_TRIES,
            log: CallBuffer::new(),
        }
    }

    /// Caps the number of picks this dispatch will issue: beyond `limit`,
    /// every request is narrowed to `[min, min]`.
    #[must_use]
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = Some(limit);
        self
    }

    /// Bounds the retry loop inside [`Self::dispatch_accepting`].
    #[must_use]
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// The call log recorded so far.
    pub fn log(&self) -> &CallBuffer {
        &self.log
    }

    /// Consumes the dispatcher, returning its recorded call log.
    #[must_use]
    pub fn into_log(self) -> CallBuffer {
        self.log
    }

    /// Requests a single integer reply in `req`'s range.
    ///
    /// # Errors
    ///
    /// Returns [`Filtered`] if the responder has no reply that fits.
    pub fn pick(&mut self, req: PickRequest) -> Result<Reply, Filtered> {
        let at_level_0 = self.level == 0;
        let depth = self.responder.depth();
        let reply = match self.depth_limit {
            Some(limit) if depth >= limit => req.min(),
            _ => self.responder.next_pick(&req).ok_or(Filtered)?,
        };
        self.log.push(req, reply);
        if at_level_0 {
            self.log.end_pick();
        }
        Ok(reply)
    }

    /// Runs `script`'s build, retrying while it raises [`Filtered`]: each
    /// retry rolls back log state pushed since the attempt began and asks
    /// the responder for an alternative playout via `start_at`. Propagates
    /// `Filtered` once the responder reports no alternative remains.
    ///
    /// # Errors
    ///
    /// Returns [`Filtered`] if every retry is exhausted.
    pub fn dispatch<T: 'static>(&mut self, script: &Script<T>) -> Result<T, Filtered> {
        let at_level_0 = self.level == 0;
        self.level += 1;
        let result = loop {
            let depth_before = self.responder.depth();
            let scratch_before = self.log.scratch_len();
            match script.call(self) {
                Ok(value) => break Ok(value),
                Err(Filtered) => {
                    let pushed = self.log.scratch_len() - scratch_before;
                    self.log.undo_pushes(pushed);
                    if !self.responder.start_at(depth_before) {
                        break Err(Filtered);
                    }
                }
            }
        };
        self.level -= 1;
        if at_level_0 && result.is_ok() {
            self.log.end_script(script.id(), Rc::from(script.name()));
        }
        result
    }

    /// Runs `dispatch(script)` repeatedly (up to `max_tries`) until
    /// `accept` returns true for the produced value, rolling back log
    /// entries and retrying an alternative playout for each rejection.
    ///
    /// # Errors
    ///
    /// Returns [`Filtered`] if `max_tries` is exhausted or the responder
    /// runs out of alternative playouts.
    pub fn dispatch_accepting<T: 'static>(
        &mut self,
        script: &Script<T>,
        accept: &dyn Fn(&T) -> bool,
    ) -> Result<T, Filtered> {
        for _ in 0..self.max_tries {
            let depth_before = self.responder.depth();
            let calls_before = self.log.calls_len();
            match self.dispatch(script) {
                Ok(value) if accept(&value) => return Ok(value),
                Ok(_) | Err(Filtered) => {
                    self.log.truncate_calls(calls_before);
                    if !self.responder.start_at(depth_before) {
                        return Err(Filtered);
                    }
                }
            }
        }
        Err(Filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{Playback, TreeWalking};
    use crate::script::Script;
    use test_log::test;

    #[test]
    fn depth_limit_forces_minimum() {
        let mut responder = Playback::new(vec![9, 9, 9]);
        let mut pick = PickFunction::new(&mut responder).with_depth_limit(1);
        let req = PickRequest::must(0, 9);
        assert_eq!(pick.pick(req.clone()), Ok(9));
        assert_eq!(pick.pick(req), Ok(0));
    }

    #[test]
    fn filtered_pick_propagates() {
        let mut responder = Playback::new(vec![20]);
        let mut pick = PickFunction::new(&mut responder);
        assert!(pick.pick(PickRequest::must(0, 5)).is_err());
    }

    #[test]
    fn accepting_retries_until_match() {
        // `Playback` has exactly one playout and can't back into an
        // alternative, so exercising the retry loop needs a responder that
        // can: `TreeWalking` advances to the next unpruned branch each time
        // `start_at` rejects the current one.
        let script = Script::of("n", vec![1, 2, 3, 4]).unwrap();
        let mut responder = TreeWalking::new();
        let mut pick = PickFunction::new(&mut responder);
        let result = pick.dispatch_accepting(&script, &|v: &i32| *v > 1);
        assert_eq!(result, Ok(2));
    }

    #[test]
    fn accepting_fails_when_exhausted() {
        let script = Script::of("n", vec![1]).unwrap();
        let mut responder = Playback::new(vec![]);
        let mut pick = PickFunction::new(&mut responder).with_max_tries(3);
        let result = pick.dispatch_accepting(&script, &|v: &i32| *v > 100);
        assert!(result.is_err());
    }

    #[test]
    fn level_zero_calls_are_logged() {
        let script = Script::of("letters", vec!['a', 'b']).unwrap();
        let mut responder = Playback::new(vec![1]);
        let mut pick = PickFunction::new(&mut responder);
        pick.dispatch(&script).unwrap();
        assert_eq!(pick.log().calls_len(), 1);
    }
}
