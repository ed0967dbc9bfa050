// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Walks a [`PickTree`], always choosing the smallest unpruned branch, so
//! that driving it to exhaustion enumerates every playout exactly once
//! (`spec.md` §4.1, §4.3).

use super::PickResponder;
use crate::pick::{PickRequest, Reply};
use crate::tree::PickTree;

/// Walks a shared [`PickTree`] in minimum-first order. A single instance is
/// meant to be driven across many playouts: each [`Self::start_at`] retires
/// the just-finished playout from the tree and rewinds to `depth`, so the
/// next `next_pick` resumes with the next unpruned branch there.
pub struct TreeWalking {
    tree: PickTree,
    history: Vec<(PickRequest, Reply)>,
    cursor: usize,
}

impl TreeWalking {
    /// Starts walking a fresh, empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::from_tree(PickTree::new())
    }

    /// Resumes walking a tree carried over from previous use (e.g. by
    /// [`crate::playouts::OrderedPlayouts`] across separate responders).
    #[must_use]
    pub fn from_tree(tree: PickTree) -> Self {
        Self {
            tree,
            history: Vec::new(),
            cursor: 0,
        }
    }

    /// Hands back the underlying tree, discarding this walk's in-flight path.
    #[must_use]
    pub fn into_tree(self) -> PickTree {
        self.tree
    }

    /// Whether every playout reachable from the root has been pruned.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.tree.is_exhausted()
    }

    /// Rewinds the replay cursor to the start of the current history,
    /// without discarding it. A fresh dispatch against this walk then
    /// replays the exact same path and produces the exact same value,
    /// rather than treating the prior dispatch's picks as already spent
    /// and sampling new ones past the end of `history`. Used by
    /// [`crate::jar::Jar::peek`] so repeated peeks (with no intervening
    /// [`Self::start_at`]) are idempotent.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl Default for TreeWalking {
    fn default() -> Self {
        Self::new()
    }
}

impl PickResponder for TreeWalking {
    fn next_pick(&mut self, req: &PickRequest) -> Option<Reply> {
        if self.cursor < self.history.len() {
            let reply = self.history[self.cursor].1;
            self.cursor += 1;
            return if req.in_range(reply) { Some(reply) } else { None };
        }

        let mut walk = self.tree.walk();
        for (recorded_req, reply) in &self.history {
            walk.push(recorded_req, *reply)
                .expect("history replays against the same tree it was recorded from");
        }
        let narrowed = walk.narrow(req);
        if narrowed.min() > narrowed.max() {
            return None;
        }
        let chosen = walk.push_unpruned(narrowed.min(), req)?;
        self.history.push((req.clone(), chosen));
        self.cursor += 1;
        Some(chosen)
    }

    fn start_at(&mut self, depth: usize) -> bool {
        if depth > self.history.len() {
            return false;
        }
        let finished_path: Vec<Reply> = self.history.iter().map(|(_, r)| *r).collect();
        self.tree.prune(&finished_path);
        self.history.truncate(depth);
        self.cursor = 0;
        let prefix: Vec<Reply> = self.history.iter().map(|(_, r)| *r).collect();
        self.tree.available(&prefix)
    }

    fn depth(&self) -> usize {
        self.cursor
    }
}
