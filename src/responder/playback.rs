// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Replays a fixed reply vector (`spec.md` §4.1).

use super::PickResponder;
use crate::pick::{PickRequest, Reply};

/// Replays a fixed sequence of replies. A reply out of the requested range
/// is a filter (`None`); once the vector is exhausted, every further pick
/// returns `req.min()` and backtracking is disabled — this is the tail
/// behavior [`crate::responder::EditResponder`] also relies on for picks
/// past the end of an edited stream.
#[derive(Debug, Clone)]
pub struct Playback {
    replies: Vec<Reply>,
    cursor: usize,
    past_end: bool,
}

impl Playback {
    /// Creates a responder that replays exactly `replies`, in order.
    #[must_use]
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            cursor: 0,
            past_end: false,
        }
    }

    /// The replies this responder was constructed with.
    #[must_use]
    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }
}

impl PickResponder for Playback {
    fn next_pick(&mut self, req: &PickRequest) -> Option<Reply> {
        if self.cursor < self.replies.len() {
            let reply = self.replies[self.cursor];
            self.cursor += 1;
            if req.in_range(reply) {
                Some(reply)
            } else {
                None
            }
        } else {
            self.past_end = true;
            self.cursor += 1;
            Some(req.min())
        }
    }

    fn start_at(&mut self, _depth: usize) -> bool {
        // A fixed reply vector has exactly one playout; there is never an
        // alternative to retry into.
        false
    }

    fn depth(&self) -> usize {
        self.cursor
    }
}
