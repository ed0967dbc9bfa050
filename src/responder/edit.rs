// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Wraps a prior reply stream with a per-index edit, replaying an edited
//! version of a previous playout (`spec.md` §4.1, §4.4).

use super::PickResponder;
use crate::pick::{PickRequest, Reply};

/// One edit applied to a single recorded pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    /// Leave the recorded reply unchanged.
    Keep,
    /// Replace the recorded reply with the carried value, clamped into the
    /// request's range if necessary (clamping itself always counts as
    /// "took effect").
    Replace(Reply),
    /// Delete this pick entirely; the source stream still advances past it.
    Snip,
}

/// Replays `source` with each index passed through `edit_at(index, req,
/// original_reply) -> Edit`. Tracks whether any edit actually changed the
/// stream (`spec.md` §4.4's `run_with_edits` `UNCHANGED` outcome).
pub struct EditResponder<'a> {
    source: Vec<Reply>,
    cursor: usize,
    edit_at: Box<dyn FnMut(usize, &PickRequest, Reply) -> Edit + 'a>,
    any_effective: bool,
    depth: usize,
}

impl<'a> EditResponder<'a> {
    /// Creates a responder replaying `source`, consulting `edit_at` for
    /// every index as it's reached.
    pub fn new(
        source: Vec<Reply>,
        edit_at: impl FnMut(usize, &PickRequest, Reply) -> Edit + 'a,
    ) -> Self {
        Self {
            source,
            cursor: 0,
            edit_at: Box::new(edit_at),
            any_effective: false,
            depth: 0,
        }
    }

    /// Whether any edit changed the replayed stream so far.
    #[must_use]
    pub fn any_effective(&self) -> bool {
        self.any_effective
    }
}

impl PickResponder for EditResponder<'_> {
    fn next_pick(&mut self, req: &PickRequest) -> Option<Reply> {
        loop {
            if self.cursor >= self.source.len() {
                self.depth += 1;
                return Some(req.min());
            }
            let index = self.cursor;
            let original = self.source[index];
            self.cursor += 1;
            match (self.edit_at)(index, req, original) {
                Edit::Keep => {
                    self.depth += 1;
                    return if req.in_range(original) {
                        Some(original)
                    } else {
                        None
                    };
                }
                Edit::Replace(v) => {
                    let clamped = req.clamp(v);
                    if clamped != original {
                        self.any_effective = true;
                    }
                    self.depth += 1;
                    return Some(clamped);
                }
                Edit::Snip => {
                    self.any_effective = true;
                    // Advance through the source stream without producing
                    // a reply for this index; loop to consult the next one.
                }
            }
        }
    }

    fn start_at(&mut self, depth: usize) -> bool {
        depth == self.depth
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn keep_everywhere_is_unchanged() {
        let mut r = EditResponder::new(vec![1, 2, 3], |_, _, _| Edit::Keep);
        let req = PickRequest::must(0, 10);
        assert_eq!(r.next_pick(&req), Some(1));
        assert_eq!(r.next_pick(&req), Some(2));
        assert_eq!(r.next_pick(&req), Some(3));
        assert!(!r.any_effective());
    }

    #[test]
    fn snip_advances_source_without_reply() {
        let mut r = EditResponder::new(vec![1, 2, 3], |i, _, _| {
            if i == 1 {
                Edit::Snip
            } else {
                Edit::Keep
            }
        });
        let req = PickRequest::must(0, 10);
        assert_eq!(r.next_pick(&req), Some(1));
        assert_eq!(r.next_pick(&req), Some(3));
        assert!(r.any_effective());
    }

    #[test]
    fn past_end_is_safe_even_after_snips() {
        let mut r = EditResponder::new(vec![1], |_, _, _| Edit::Snip);
        let req = PickRequest::must(2, 9);
        // only one entry, snipped; further picks come from "past end".
        assert_eq!(r.next_pick(&req), Some(2));
        assert_eq!(r.next_pick(&req), Some(2));
    }

    #[test]
    fn replace_clamps_out_of_range() {
        let mut r = EditResponder::new(vec![5], |_, _, _| Edit::Replace(100));
        let req = PickRequest::must(0, 9);
        assert_eq!(r.next_pick(&req), Some(9));
        assert!(r.any_effective());
    }
}
