// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The shared search tree: [`PickTree`] records every branch visited by any
//! playout so far, lets callers mark a branch as exhausted ([`PickTree::prune`]),
//! and answers [`PickTree::available`] queries cheaply. [`Walk`] is a cursor
//! into the tree used by the tree-walking responder and by ordered playouts.

use crate::error::{PickError, PickResult};
use crate::pick::{PickRequest, Reply};
use rustc_hash::FxHashMap;

/// One child slot of a [`Node`].
#[derive(Debug)]
enum Branch {
    Child(Node),
    Pruned,
}

/// A node for one visited `PickRequest` prefix.
///
/// `range` is set the first time this node is visited (from the request
/// used at that visit) and checked against every later visit —  a mismatch
/// is the "range mismatch" program error from `spec.md` §4.3. `live_min`
/// starts at `range.0` and advances past consecutively-pruned low branches,
/// which is what lets left-heavy shrinking find "the first unpruned branch"
/// in O(1) instead of rescanning from the original minimum every time.
#[derive(Debug, Default)]
struct Node {
    range: Option<(i32, i32)>,
    live_min: i32,
    branches: FxHashMap<i32, Branch>,
}

impl Node {
    fn ensure_range(&mut self, req: &PickRequest) -> PickResult<()> {
        match self.range {
            None => {
                self.range = Some((req.min(), req.max()));
                self.live_min = req.min();
                Ok(())
            }
            Some((min, max)) if min == req.min() && max == req.max() => Ok(()),
            Some(recorded) => Err(PickError::RangeMismatch {
                recorded,
                requested: (req.min(), req.max()),
            }),
        }
    }

    fn max(&self) -> i32 {
        self.range.map_or(i32::MAX, |(_, max)| max)
    }

    fn is_pruned(&self, key: i32) -> bool {
        if key < self.live_min {
            return true;
        }
        matches!(self.branches.get(&key), Some(Branch::Pruned))
    }

    /// Marks `key` pruned and coalesces consecutively-pruned low branches
    /// into an advance of `live_min`, freeing their storage. Returns whether
    /// this node is now fully pruned (every branch in its range exhausted).
    fn prune_key(&mut self, key: i32) -> bool {
        self.branches.insert(key, Branch::Pruned);
        while self.live_min <= self.max() {
            match self.branches.get(&self.live_min) {
                Some(Branch::Pruned) => {
                    self.branches.remove(&self.live_min);
                    self.live_min += 1;
                }
                _ => break,
            }
        }
        self.live_min > self.max()
    }

    fn child_mut(&mut self, key: i32, req: &PickRequest) -> PickResult<&mut Node> {
        self.ensure_range(req)?;
        match self.branches.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => match entry.into_mut() {
                Branch::Child(child) => Ok(child),
                Branch::Pruned => unreachable!("pushed into a pruned branch"),
            },
            std::collections::hash_map::Entry::Vacant(entry) => match entry.insert(Branch::Child(Node::default())) {
                Branch::Child(child) => Ok(child),
                Branch::Pruned => unreachable!(),
            },
        }
    }

    fn child(&self, key: i32) -> Option<&Node> {
        match self.branches.get(&key) {
            Some(Branch::Child(child)) => Some(child),
            _ => None,
        }
    }
}

/// The shared search tree. Constructed empty; mutated only through
/// [`PickTree::walk`]'s [`Walk`] cursor or directly via [`PickTree::prune`].
#[derive(Debug, Default)]
pub struct PickTree {
    root: Node,
    /// Set once the root becomes fully pruned: every playout has been seen.
    exhausted: bool,
}

impl PickTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff no ancestor along `replies` is pruned (i.e. this exact
    /// sequence of branch choices has not been ruled out).
    #[must_use]
    pub fn available(&self, replies: &[Reply]) -> bool {
        if self.exhausted {
            return false;
        }
        let mut node = &self.root;
        for &key in replies {
            if node.is_pruned(key) {
                return false;
            }
            match node.child(key) {
                Some(child) => node = child,
                None => return true, // unexplored subtree: available by definition
            }
        }
        true
    }

    /// Marks the leaf at `path` pruned and coalesces upward. `path` must
    /// have been produced by a `Walk` over this same tree (every prefix
    /// node must already exist).
    pub fn prune(&mut self, path: &[Reply]) {
        if path.is_empty() {
            self.exhausted = true;
            return;
        }
        if Self::prune_rec(&mut self.root, path) {
            self.exhausted = true;
        }
    }

    fn prune_rec(node: &mut Node, path: &[Reply]) -> bool {
        let (&key, rest) = path.split_first().expect("non-empty path");
        if rest.is_empty() {
            node.prune_key(key)
        } else {
            let fully_pruned_child = match node.branches.get_mut(&key) {
                Some(Branch::Child(child)) => Self::prune_rec(child, rest),
                // Already pruned (or never visited, which a valid path
                // shouldn't reach): nothing left to coalesce here, and this
                // alone doesn't mean the *parent* node is fully pruned.
                _ => false,
            };
            if fully_pruned_child {
                node.prune_key(key)
            } else {
                false
            }
        }
    }

    /// Whether every playout in this tree has been pruned.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Starts a new [`Walk`] over this tree, from the root.
    pub fn walk(&mut self) -> Walk<'_> {
        Walk {
            tree: self,
            path: Vec::new(),
        }
    }
}

/// A cursor into a [`PickTree`], tracking the path of replies chosen so
/// far. Used by the tree-walking responder (`spec.md` §4.1) and by ordered
/// playouts (§4.3).
pub struct Walk<'a> {
    tree: &'a mut PickTree,
    path: Vec<Reply>,
}

impl<'a> Walk<'a> {
    /// Current depth (number of picks made so far on this walk).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The path of replies chosen so far.
    #[must_use]
    pub fn path(&self) -> &[Reply] {
        &self.path
    }

    fn current_node(&self) -> &Node {
        let mut node = &self.tree.root;
        for &key in &self.path {
            node = node.child(key).expect("walk path always exists in tree");
        }
        node
    }

    fn current_node_mut(&mut self) -> &mut Node {
        let mut node = &mut self.tree.root;
        for &key in &self.path {
            node = match node.branches.get_mut(&key) {
                Some(Branch::Child(child)) => child,
                _ => unreachable!("walk path always exists in tree"),
            };
        }
        node
    }

    /// Restricts `req` to the current node's live `[min, max]`, without
    /// mutating the tree. If the current position hasn't been visited yet,
    /// `req` is returned unchanged (there's nothing to narrow against).
    #[must_use]
    pub fn narrow(&self, req: &PickRequest) -> PickRequest {
        let node = self.current_node();
        match node.range {
            Some((_, max)) => PickRequest::must(node.live_min.max(req.min()), max.min(req.max())),
            None => req.clone(),
        }
    }

    /// Whether `key` is pruned at the current position.
    #[must_use]
    pub fn is_pruned(&self, key: i32) -> bool {
        self.current_node().is_pruned(key)
    }

    /// Records a pick of `reply` to `req` at the current position, creating
    /// the child node if this is the first visit, and advances the walk.
    ///
    /// # Errors
    ///
    /// Returns [`PickError::RangeMismatch`] if this position was previously
    /// visited with a different request range.
    pub fn push(&mut self, req: &PickRequest, reply: Reply) -> PickResult<()> {
        self.current_node_mut().child_mut(reply, req)?;
        self.path.push(reply);
        Ok(())
    }

    /// Moves to the first unpruned branch at or after `first_choice` within
    /// `req`'s range, wrapping around to `req.min()` if none is found above.
    /// Creates the child node if absent. Returns the chosen reply, or
    /// `None` if every branch in `req`'s range is pruned.
    pub fn push_unpruned(&mut self, first_choice: Reply, req: &PickRequest) -> Option<Reply> {
        let node = self.current_node();
        let (lo, hi) = node.range.map_or((req.min(), req.max()), |(_, max)| {
            (node.live_min, max)
        });
        let lo = lo.max(req.min());
        let hi = hi.min(req.max());
        if lo > hi {
            return None;
        }

        let candidate = (first_choice.max(lo)..=hi)
            .find(|&k| !node.is_pruned(k))
            .or_else(|| (lo..first_choice.min(hi + 1)).find(|&k| !node.is_pruned(k)));

        let chosen = candidate?;
        self.push(req, chosen).expect("narrowed request matches recorded range");
        Some(chosen)
    }

    /// Cuts the walk's path back to `depth`, discarding everything after.
    /// Does not touch the tree itself.
    pub fn trim(&mut self, depth: usize) {
        self.path.truncate(depth);
    }

    /// Prunes the current leaf (the full path walked so far) and
    /// coalesces upward, then pops the leaf so the walk is positioned at
    /// its parent.
    pub fn prune(&mut self) {
        self.tree.prune(&self.path);
        self.path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn req(min: i32, max: i32) -> PickRequest {
        PickRequest::must(min, max)
    }

    #[test]
    fn fresh_tree_is_available_everywhere() {
        let tree = PickTree::new();
        assert!(tree.available(&[]));
        assert!(tree.available(&[0, 1, 1]));
    }

    #[test]
    fn prune_leaf_marks_it_unavailable() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 1), 0).unwrap();
            walk.push(&req(0, 1), 1).unwrap();
        }
        tree.prune(&[0, 1]);
        assert!(!tree.available(&[0, 1]));
        assert!(tree.available(&[0, 0]));
        assert!(tree.available(&[1]));
    }

    #[test]
    fn pruning_all_children_coalesces_to_parent() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 1), 0).unwrap();
        }
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 1), 1).unwrap();
        }
        tree.prune(&[0]);
        tree.prune(&[1]);
        assert!(tree.is_exhausted());
        assert!(!tree.available(&[]));
    }

    #[test]
    fn range_mismatch_is_an_error() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 1), 0).unwrap();
        }
        let mut walk = tree.walk();
        let err = walk.push(&req(0, 5), 0);
        assert!(err.is_err());
    }

    #[test]
    fn push_unpruned_skips_pruned_branches() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 2), 0).unwrap();
        }
        tree.prune(&[0]);
        let mut walk = tree.walk();
        let chosen = walk.push_unpruned(0, &req(0, 2));
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn push_unpruned_wraps_around() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 2), 1).unwrap();
        }
        tree.prune(&[1]);
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 2), 2).unwrap();
        }
        tree.prune(&[2]);
        let mut walk = tree.walk();
        let chosen = walk.push_unpruned(2, &req(0, 2));
        assert_eq!(chosen, Some(0));
    }

    #[test]
    fn push_unpruned_returns_none_when_exhausted() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 0), 0).unwrap();
        }
        tree.prune(&[0]);
        let mut walk = tree.walk();
        assert_eq!(walk.push_unpruned(0, &req(0, 0)), None);
        assert!(tree.is_exhausted());
    }

    #[test]
    fn narrow_reflects_live_min() {
        let mut tree = PickTree::new();
        {
            let mut walk = tree.walk();
            walk.push(&req(0, 3), 0).unwrap();
        }
        tree.prune(&[0]);
        let walk = tree.walk();
        let narrowed = walk.narrow(&req(0, 3));
        assert_eq!((narrowed.min(), narrowed.max()), (1, 3));
    }
}
