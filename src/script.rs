// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Script<T>`]: a named, deterministic build function plus the flags that
//! control how the dispatcher logs and caches its calls, and the small set
//! of combinators (`map`, `filter`, `chain`, `of`, `one_of`) that are
//! expressible purely in terms of [`crate::dispatch::PickFunction`].

use crate::dispatch::{Filtered, PickFunction};
use crate::error::{PickError, PickResult};
use crate::pick::PickRequest;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A process-wide monotonic id, used in place of reference equality (see
/// `spec.md` §9 "Identity comparisons") so script-call caching and
/// unique-column `Domain` matches have something stable to compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptId(u64);

impl ScriptId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Flags controlling how the dispatcher treats a [`Script`]'s calls.
#[derive(Clone, Debug)]
pub struct ScriptOpts {
    /// Finite cardinality bound, if this script can only ever produce this
    /// many distinct reply sequences. Drives [`crate::playouts::OrderedPlayouts`]
    /// coverage and `Domain`'s uniqueness bookkeeping.
    pub max_size: Option<u64>,

    /// Whether a build result may be cached and reused by identity without
    /// replaying its picks (requires the result be treated as immutable
    /// once produced — see `spec.md` §6 "Frozen-value policy").
    pub cachable: bool,

    /// Whether this script's immediate sub-calls should be individually
    /// addressable as separate groups during `run_with_edits`, rather than
    /// folded into one all-or-nothing group (`spec.md` §4.4 "Splitting").
    pub split_calls: bool,

    /// Whether the dispatcher should skip the usual dry-run consistency
    /// probe for this script, so mutually-recursive scripts can be
    /// constructed before their build functions are first callable.
    pub lazy_init: bool,

    /// Whether top-level pick/script-call boundaries are recorded into a
    /// [`crate::call::CallLog`] while this script's build runs.
    pub log_calls: bool,

    /// Relative selection weight when this script is one case of a
    /// `one_of` union. Must be `>= 0`.
    pub weight: f64,
}

impl Default for ScriptOpts {
    fn default() -> Self {
        Self {
            max_size: None,
            cachable: false,
            split_calls: false,
            lazy_init: false,
            log_calls: false,
            weight: 1.0,
        }
    }
}

type BuildFn<T> = dyn Fn(&mut PickFunction) -> Result<T, Filtered>;

/// An immutable, named, deterministic build function: `(PickFunction) -> T`.
///
/// `Script` is cheap to clone (an `Rc` around the build closure) and is
/// meant to be constructed once and shared across many dispatches. Calling
/// a `Script`'s build function twice with equal picks must produce equal
/// (if not identical) values — this is the crate's core determinism
/// contract (`spec.md` §8 "Determinism").
pub struct Script<T> {
    id: ScriptId,
    name: Rc<str>,
    build: Rc<BuildFn<T>>,
    opts: ScriptOpts,
}

impl<T> Clone for Script<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Rc::clone(&self.name),
            build: Rc::clone(&self.build),
            opts: self.opts.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Script<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Script<T> {
    /// Creates a new script from a name, a build function, and options.
    pub fn make(
        name: impl Into<Rc<str>>,
        build: impl Fn(&mut PickFunction) -> Result<T, Filtered> + 'static,
        opts: ScriptOpts,
    ) -> Self {
        Self {
            id: ScriptId::next(),
            name: name.into(),
            build: Rc::new(build),
            opts,
        }
    }

    /// This script's process-wide identity, used for cache matching.
    #[must_use]
    pub fn id(&self) -> ScriptId {
        self.id
    }

    /// This script's name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This script's options.
    #[must_use]
    pub fn opts(&self) -> &ScriptOpts {
        &self.opts
    }

    /// Overrides this script's `one_of` selection weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.opts.weight = weight;
        self
    }

    /// Invokes the build function directly. Callers normally go through
    /// [`PickFunction::dispatch`] instead, which handles logging and retry.
    pub(crate) fn call(&self, pick: &mut PickFunction) -> Result<T, Filtered> {
        (self.build)(pick)
    }

    /// A script that always produces `f(pick)`'s integer pick, mapped
    /// through `f`. The thinnest possible wrapper over a raw request.
    pub fn from_request(name: impl Into<Rc<str>>, req: PickRequest) -> Script<i32> {
        Script::make(
            name,
            move |pick| pick.pick(req.clone()),
            ScriptOpts::default(),
        )
    }

    /// Chooses uniformly among a fixed set of cloneable constants.
    pub fn of(name: impl Into<Rc<str>>, values: Vec<T>) -> PickResult<Self>
    where
        T: Clone,
    {
        if values.is_empty() {
            return Err(PickError::EmptyUnion);
        }
        let n = values.len();
        let req = PickRequest::must(0, (n - 1) as i32);
        Ok(Self::make(
            name,
            move |pick| {
                let idx = pick.pick(req.clone())?;
                Ok(values[idx as usize].clone())
            },
            ScriptOpts::default(),
        ))
    }

    /// Builds a weighted union of cases (`spec.md` §4.5). If every weight is
    /// equal, selection uses a plain uniform request; otherwise the weights
    /// are converted to a deterministic 32-bit cumulative distribution
    /// (`spec.md` §9 "Deterministic weighted choice") so the choice is
    /// reproducible across hosts.
    pub fn one_of(name: impl Into<Rc<str>>, cases: Vec<Script<T>>) -> PickResult<Self> {
        if cases.is_empty() {
            return Err(PickError::EmptyUnion);
        }
        for case in &cases {
            if case.opts.weight < 0.0 {
                return Err(PickError::NegativeWeight {
                    weight: case.opts.weight,
                });
            }
        }

        let all_equal = cases
            .windows(2)
            .all(|w| (w[0].opts.weight - w[1].opts.weight).abs() < f64::EPSILON);

        let name = name.into();
        if all_equal {
            let req = PickRequest::must(0, (cases.len() - 1) as i32);
            Ok(Self::make(
                name,
                move |pick| {
                    let idx = pick.pick(req.clone())? as usize;
                    pick.dispatch(&cases[idx])
                },
                ScriptOpts::default(),
            ))
        } else {
            let total: f64 = cases.iter().map(|c| c.opts.weight).sum();
            // s_i = floor(w_i / sum * 2^31), remainder folded into the last bucket.
            // Scaled to i32::MAX + 1 (not 2^32) since replies are signed i32s.
            const SCALE: f64 = 2_147_483_648.0; // 2^31
            let mut thresholds = Vec::with_capacity(cases.len());
            let mut acc: u64 = 0;
            for case in &cases[..cases.len() - 1] {
                let share = ((case.opts.weight / total) * SCALE).floor() as u64;
                acc += share;
                thresholds.push(acc);
            }
            thresholds.push(i32::MAX as u64 + 1);

            let req = PickRequest::must(0, i32::MAX);
            Ok(Self::make(
                name,
                move |pick| {
                    let raw = pick.pick(req.clone())? as u64;
                    let idx = thresholds.partition_point(|&t| raw >= t);
                    pick.dispatch(&cases[idx])
                },
                ScriptOpts::default(),
            ))
        }
    }

    /// Maps produced values through a pure function.
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Script<U> {
        let inner = self.clone();
        Script::make(
            Rc::clone(&self.name),
            move |pick| inner.call(pick).map(&f),
            self.opts.clone(),
        )
    }

    /// Restricts this script to values accepted by `f`, delegating to the
    /// dispatcher's accept-retry loop (`spec.md` §4.2).
    pub fn filter(&self, f: impl Fn(&T) -> bool + 'static) -> Script<T> {
        let inner = self.clone();
        Script::make(
            Rc::clone(&self.name),
            move |pick| pick.dispatch_accepting(&inner, &f),
            ScriptOpts::default(),
        )
    }

    /// Binds this script's value into a new script (a dependent / "flat
    /// map" combinator, `spec.md` §4.5 "Derived operations").
    pub fn chain<U: 'static>(&self, f: impl Fn(T) -> Script<U> + 'static) -> Script<U> {
        let inner = self.clone();
        Script::make(
            Rc::clone(&self.name),
            move |pick| {
                let value = inner.call(pick)?;
                let next = f(value);
                pick.dispatch(&next)
            },
            ScriptOpts::default(),
        )
    }
}
