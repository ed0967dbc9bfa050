// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Sources of replies for a [`crate::dispatch::PickFunction`] to dispatch
//! against: random, playback, edit-replay, and tree-walking (`spec.md` §4.1).

pub mod edit;
pub mod playback;
pub mod random;
pub mod tree_walk;

pub use edit::EditResponder;
pub use playback::Playback;
pub use random::Random;
pub use tree_walk::TreeWalking;

use crate::pick::{PickRequest, Reply};

/// A source of replies to `PickRequest`s.
///
/// `next_pick` returning `None` means "filtered": no reply this responder
/// can offer fits the request, and the dispatcher should treat the current
/// build attempt as rejected. `start_at(depth)` asks the responder to begin
/// a new playout that shares the first `depth` picks with the current one;
/// returning `false` means no such alternative playout exists and the
/// in-flight `Filtered` should propagate rather than retry.
pub trait PickResponder {
    /// Produces the next reply for `req`, or `None` if filtered.
    fn next_pick(&mut self, req: &PickRequest) -> Option<Reply>;

    /// Attempts to begin a new playout continuing from `depth`. Returns
    /// `false` if no alternative remains.
    fn start_at(&mut self, depth: usize) -> bool;

    /// How many picks have been issued so far on the current playout.
    fn depth(&self) -> usize;
}
