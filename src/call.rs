// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The structured call log: [`CallBuffer`] (write side, built up by a
//! [`crate::dispatch::PickFunction`]) and [`CallLog`] (read side, replayed
//! and edited to shrink a failing value) (`spec.md` §4.4).

use crate::dispatch::{Filtered, PickFunction};
use crate::pick::{PickList, PickRequest, Reply};
use crate::responder::edit::Edit;
use crate::responder::Playback;
use crate::script::{Script, ScriptId};
use std::any::Any;
use std::rc::Rc;

/// What a [`Call`] was made against: a raw integer pick, or a dispatch into
/// a named sub-script.
#[derive(Clone, Debug)]
pub enum CallArg {
    /// A single `(request, reply)` pick.
    Pick(PickRequest),
    /// A dispatch into a script, identified by its process-wide id.
    Script { id: ScriptId, name: Rc<str> },
}

/// One entry in a [`CallLog`]: either a pick call or a script call, carrying
/// the full (possibly flattened, for a script call) group of picks that
/// produced it.
///
/// `cached` is always `None` in this implementation: `spec.md` §6 states
/// caching is an optimization callers must not depend on for correctness,
/// so every `run`/`run_with_edits` rebuilds by replaying `group` rather
/// than exploiting a cached value. The field is kept so the data model
/// matches the spec's "Script matching" rule, which composite Domains and
/// a future cache layer can read.
#[derive(Clone, Debug)]
pub struct Call {
    arg: CallArg,
    cached: Option<Rc<dyn Any>>,
    group: PickList,
}

impl Call {
    /// What this call was made against.
    #[must_use]
    pub fn arg(&self) -> &CallArg {
        &self.arg
    }

    /// The cached value, if any (always `None` in this implementation).
    #[must_use]
    pub fn cached(&self) -> Option<&Rc<dyn Any>> {
        self.cached.as_ref()
    }

    /// The picks that produced this call.
    #[must_use]
    pub fn group(&self) -> &PickList {
        &self.group
    }
}

/// Write side: accumulates picks into a scratch group and closes them off
/// into [`Call`]s at level-0 boundaries (`spec.md` §4.4).
#[derive(Debug, Default, Clone)]
pub struct CallBuffer {
    calls: Vec<Call>,
    scratch: PickList,
}

impl CallBuffer {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one `(request, reply)` pick to the in-progress group.
    pub fn push(&mut self, req: PickRequest, reply: Reply) {
        self.scratch.push(req, reply);
    }

    /// Number of picks in the in-progress group.
    #[must_use]
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Removes the last `n` picks pushed to the in-progress group, undoing
    /// a failed dispatch attempt.
    pub fn undo_pushes(&mut self, n: usize) {
        self.scratch.truncate_last(n);
    }

    /// Closes the in-progress group off as a pick call.
    pub fn end_pick(&mut self) {
        let group = std::mem::take(&mut self.scratch);
        let req = group.requests()[0].clone();
        self.calls.push(Call {
            arg: CallArg::Pick(req),
            cached: None,
            group,
        });
    }

    /// Closes the in-progress group off as a script call.
    pub fn end_script(&mut self, id: ScriptId, name: Rc<str>) {
        let group = std::mem::take(&mut self.scratch);
        self.calls.push(Call {
            arg: CallArg::Script { id, name },
            cached: None,
            group,
        });
    }

    /// Number of closed-off calls so far.
    #[must_use]
    pub fn calls_len(&self) -> usize {
        self.calls.len()
    }

    /// Discards calls beyond `len`, undoing a rejected `accept` attempt.
    pub fn truncate_calls(&mut self, len: usize) {
        self.calls.truncate(len);
    }

    /// Freezes this buffer into a read-only [`CallLog`].
    #[must_use]
    pub fn into_log(self) -> CallLog {
        CallLog { calls: self.calls }
    }
}

/// Read side: an immutable, ordered sequence of [`Call`]s produced by one
/// completed dispatch. Supports rebuilding the value (`run`) and shrinking
/// it by editing the recorded picks (`run_with_edits`).
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Vec<Call>,
}

/// The outcome of [`CallLog::run_with_edits`].
pub enum RunOutcome<T> {
    /// The edited picks produced a (possibly unchanged-looking) value.
    Value(T),
    /// No edit took effect; the log is identical to the input.
    Unchanged,
    /// The script raised [`Filtered`] against the edited picks.
    Filtered,
}

/// How to edit one [`Call`]'s group during [`CallLog::run_with_edits`].
pub enum GroupEdit<'a> {
    /// Drop this call's entire group of picks.
    RemoveGroup,
    /// Edit this call's picks individually; called once per pick with a
    /// group-local index.
    Picks(Box<dyn FnMut(usize, &PickRequest, Reply) -> Edit + 'a>),
}

impl CallLog {
    /// The recorded calls, in order.
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// The full flat reply stream: concatenating every call's group
    /// (`spec.md` §3 CallLog invariant).
    #[must_use]
    pub fn replies(&self) -> Vec<Reply> {
        self.calls
            .iter()
            .flat_map(|c| c.group.replies().iter().copied())
            .collect()
    }

    /// Rebuilds the value by replaying the recorded picks through `script`.
    ///
    /// # Errors
    ///
    /// Returns [`Filtered`] if replaying the recorded picks no longer
    /// satisfies `script` (it shouldn't, for a deterministic script, but
    /// the signature stays honest about what replay can do).
    pub fn run<T: 'static>(&self, script: &Script<T>) -> Result<T, Filtered> {
        let mut responder = Playback::new(self.replies());
        let mut pick = PickFunction::new(&mut responder);
        pick.dispatch(script)
    }

    /// Re-runs `script` while applying `edits` to each call's group.
    ///
    /// `edits(call_index)` is consulted once per call. When
    /// `script.opts().split_calls` is false, only `edits(0)` is consulted
    /// and applied to the entire log as a single flattened group; edits at
    /// any other index are never requested (`spec.md` §4.4 "Splitting").
    pub fn run_with_edits<'a, T: 'static>(
        &self,
        script: &Script<T>,
        mut edits: impl FnMut(usize) -> GroupEdit<'a>,
    ) -> RunOutcome<T> {
        let mut combined = Vec::new();
        let mut any_effective = false;

        let apply_group = |edit: GroupEdit, picks: &[(PickRequest, Reply)], out: &mut Vec<Reply>, effective: &mut bool| {
            match edit {
                GroupEdit::RemoveGroup => {
                    if !picks.is_empty() {
                        *effective = true;
                    }
                }
                GroupEdit::Picks(mut f) => {
                    for (j, (req, reply)) in picks.iter().enumerate() {
                        match f(j, req, *reply) {
                            Edit::Keep => out.push(*reply),
                            Edit::Replace(v) => {
                                let clamped = req.clamp(v);
                                if clamped != *reply {
                                    *effective = true;
                                }
                                out.push(clamped);
                            }
                            Edit::Snip => *effective = true,
                        }
                    }
                }
            }
        };

        if script.opts().split_calls {
            for (i, call) in self.calls.iter().enumerate() {
                let picks: Vec<(PickRequest, Reply)> = call
                    .group
                    .requests()
                    .iter()
                    .cloned()
                    .zip(call.group.replies().iter().copied())
                    .collect();
                apply_group(edits(i), &picks, &mut combined, &mut any_effective);
            }
        } else {
            let picks: Vec<(PickRequest, Reply)> = self
                .calls
                .iter()
                .flat_map(|c| {
                    c.group
                        .requests()
                        .iter()
                        .cloned()
                        .zip(c.group.replies().iter().copied())
                })
                .collect();
            apply_group(edits(0), &picks, &mut combined, &mut any_effective);
        }

        if !any_effective {
            return RunOutcome::Unchanged;
        }

        let mut responder = Playback::new(combined);
        let mut pick = PickFunction::new(&mut responder);
        match pick.dispatch(script) {
            Ok(value) => RunOutcome::Value(value),
            Err(Filtered) => RunOutcome::Filtered,
        }
    }
}
