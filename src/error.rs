// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Error types for the pick-sequence core.
//!
//! There are three distinct failure channels (see `spec.md` §7):
//!
//! - `Filtered` (in [`crate::dispatch`]) is a control signal, not an error,
//!   and never escapes this crate's public API.
//! - [`ParseError`] is returned by [`crate::domain::Domain::parse`] when a
//!   value does not belong to the domain.
//! - [`PickError`] covers fatal, programmer-facing invariant violations:
//!   malformed requests, inconsistent domains, bad edits.

use std::fmt;

/// A validation failure produced while parsing a value against a [`crate::domain::Domain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,

    /// A debug rendering of the value that failed to parse.
    pub actual: String,

    /// Location within a composite value, e.g. `"array[2]"` or `"parent.child"`.
    pub at: Option<String>,
}

impl ParseError {
    /// Creates a new parse error with no location.
    #[must_use]
    pub fn new(message: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            actual: actual.into(),
            at: None,
        }
    }

    /// Prepends `segment` to this error's location path.
    ///
    /// Composite domains call this as validation errors bubble up from
    /// children, so the final path reads outer-to-inner
    /// (`"array[0].name"`, not `"name"`).
    #[must_use]
    pub fn nest(mut self, segment: impl Into<String>) -> Self {
        self.at = Some(match self.at.take() {
            Some(existing) => format!("{}.{existing}", segment.into()),
            None => segment.into(),
        });
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.at {
            Some(at) => write!(f, "{at}: {} (got: {})", self.message, self.actual),
            None => write!(f, "{} (got: {})", self.message, self.actual),
        }
    }
}

impl std::error::Error for ParseError {}

/// A callback used by `pickify` implementations to report why a value was
/// rejected. Composite domains wrap the inner error with their own location
/// segment before forwarding it.
pub type SendErr<'a> = dyn FnMut(ParseError) + 'a;

/// Fatal, programmer-facing errors: these indicate a broken `Domain`,
/// `Script`, `PickTree`, or `CallLog` edit, never a rejected user value.
#[derive(Debug)]
pub enum PickError {
    /// `PickRequest::new` was given `min > max`.
    InvalidRange {
        /// The offending lower bound.
        min: i32,
        /// The offending upper bound.
        max: i32,
    },

    /// A `Domain`'s consistency dry-run found that `pickify(default)` did
    /// not reproduce the minimum picks used to build that default.
    InconsistentDomain {
        /// What the dry-run expected.
        expected: Vec<i32>,
        /// What `pickify` actually returned.
        actual: Option<Vec<i32>>,
    },

    /// A `PickTree` node was asked to narrow a request whose range doesn't
    /// match the range recorded when that node was created.
    RangeMismatch {
        /// Range recorded at node creation.
        recorded: (i32, i32),
        /// Range requested on a later visit.
        requested: (i32, i32),
    },

    /// An edit function referenced a pick index outside the call's group.
    InvalidEditIndex {
        /// The index that was out of bounds.
        index: usize,
        /// The number of picks actually present in the group.
        len: usize,
    },

    /// `one_of` was given a case with a negative weight.
    NegativeWeight {
        /// The offending weight.
        weight: f64,
    },

    /// `one_of`/`of` was given zero cases.
    EmptyUnion,
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { min, max } => {
                write!(f, "invalid pick request: min ({min}) > max ({max})")
            }
            Self::InconsistentDomain { expected, actual } => write!(
                f,
                "inconsistent domain: pickify(default) returned {actual:?}, expected {expected:?}"
            ),
            Self::RangeMismatch {
                recorded,
                requested,
            } => write!(
                f,
                "pick tree range mismatch: node was created with {recorded:?}, later requested with {requested:?}"
            ),
            Self::InvalidEditIndex { index, len } => {
                write!(f, "invalid edit index {index} (group has {len} picks)")
            }
            Self::NegativeWeight { weight } => write!(f, "negative weight in one_of: {weight}"),
            Self::EmptyUnion => write!(f, "one_of/of given zero cases"),
        }
    }
}

impl std::error::Error for PickError {}

/// Result alias for fallible constructors throughout the crate.
pub type PickResult<T> = std::result::Result<T, PickError>;
