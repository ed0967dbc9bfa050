// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Domain<T>`]: a [`Script<T>`] paired with an inverse `pickify`, so
//! values can be round-tripped to canonical pick sequences for validation,
//! deduplication, and table uniqueness (`spec.md` §4.6).

use crate::config::Config;
use crate::dispatch::{Filtered, PickFunction};
use crate::error::{ParseError, PickError, PickResult, SendErr};
use crate::gen::Gen;
use crate::pick::{BiasFn, PickRequest, Reply};
use crate::responder::Playback;
use crate::script::{Script, ScriptOpts};
use rand::Rng;
use std::rc::Rc;
use std::sync::Arc;

type PickifyFn<T> = dyn Fn(&T, &mut SendErr<'_>) -> Option<Vec<Reply>>;

/// The two-coin array-length bias (`spec.md` §9 "Open questions"): a fixed
/// high continue-probability while still inside the `start_region_size`
/// items, then a second coin whose continue-probability decays with
/// distance past it, floored at `min_probability` so it never degenerates
/// into an effectively-deterministic stop. Advisory only — ordered and
/// tree-walking responders ignore a request's bias entirely, so this only
/// shapes the distribution `Random` draws, never which lengths are
/// reachable.
fn length_gate_bias(config: &Config, extra_taken: usize) -> BiasFn {
    let start_region = config.start_region_size as usize;
    let floor = config.min_probability;
    Arc::new(move |rng| {
        let p_continue = if extra_taken < start_region {
            0.75
        } else {
            (0.75 / (extra_taken - start_region + 2) as f64).max(floor)
        };
        i32::from(rng.random_bool(p_continue))
    })
}

/// A [`Script<T>`] paired with an inverse: `pickify(value)` returns the
/// canonical reply sequence that rebuilds an equal value, or `None` (after
/// reporting at least one error via `send_err`) if `value` isn't a member.
///
/// Canonical means: the minimum reply sequence, in lexicographic order
/// (shorter sequences that are a prefix of a longer alternative sort
/// first), among all sequences that rebuild an equal value.
#[derive(Clone)]
pub struct Domain<T> {
    build: Script<T>,
    pickify: Rc<PickifyFn<T>>,
}

impl<T: 'static> Domain<T> {
    /// Creates a domain from `build` and its inverse `pickify`.
    ///
    /// Runs the consistency dry-run from `spec.md` §4.6 unless
    /// `build.opts().lazy_init` is set: it computes the default value from
    /// `build` under minimum picks, calls `pickify(default)`, and checks
    /// that the result is no longer than the raw picks that default
    /// actually consumed and replays back to an equal value. Domains whose
    /// build can't proceed from an all-minimum start without backtracking
    /// (uniqueness-driven ones; see [`unique_array`]) opt out via
    /// `lazy_init` instead of running this probe.
    ///
    /// # Errors
    ///
    /// Returns [`PickError::InconsistentDomain`] if the dry-run fails.
    pub fn make(
        build: Script<T>,
        pickify: impl Fn(&T, &mut SendErr<'_>) -> Option<Vec<Reply>> + 'static,
    ) -> PickResult<Self>
    where
        T: PartialEq,
    {
        let domain = Self {
            build,
            pickify: Rc::new(pickify),
        };
        if !domain.build.opts().lazy_init {
            domain.check_consistency()?;
        }
        Ok(domain)
    }

    fn check_consistency(&self) -> PickResult<()>
    where
        T: PartialEq,
    {
        let mut responder = Playback::new(Vec::new());
        let mut pick = PickFunction::new(&mut responder);
        let default_value =
            pick.dispatch(&self.build)
                .map_err(|Filtered| PickError::InconsistentDomain {
                    expected: Vec::new(),
                    actual: None,
                })?;
        let raw_minimum = pick.into_log().into_log().replies();

        let mut errors = Vec::new();
        let actual = self.pickify_raw(&default_value, &mut errors);
        let Some(actual_picks) = actual else {
            return Err(PickError::InconsistentDomain {
                expected: raw_minimum,
                actual: None,
            });
        };
        if actual_picks.len() > raw_minimum.len() {
            return Err(PickError::InconsistentDomain {
                expected: raw_minimum,
                actual: Some(actual_picks),
            });
        }

        let mut responder = Playback::new(actual_picks.clone());
        let mut pick = PickFunction::new(&mut responder);
        let rebuilt =
            pick.dispatch(&self.build)
                .map_err(|Filtered| PickError::InconsistentDomain {
                    expected: raw_minimum.clone(),
                    actual: Some(actual_picks.clone()),
                })?;
        if rebuilt != default_value {
            return Err(PickError::InconsistentDomain {
                expected: raw_minimum,
                actual: Some(actual_picks),
            });
        }
        Ok(())
    }

    fn pickify_raw(&self, value: &T, errors: &mut Vec<ParseError>) -> Option<Vec<Reply>> {
        let mut sink = |err: ParseError| errors.push(err);
        (self.pickify)(value, &mut sink)
    }

    /// The underlying build script.
    #[must_use]
    pub fn build(&self) -> &Script<T> {
        &self.build
    }

    /// Returns the canonical reply sequence for `value`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParseError`] reported by `pickify` if `value`
    /// isn't a member of this domain.
    pub fn parse(&self, value: &T) -> Result<Vec<Reply>, ParseError> {
        let mut errors = Vec::new();
        match self.pickify_raw(value, &mut errors) {
            Some(picks) => Ok(picks),
            None => Err(errors
                .into_iter()
                .next()
                .unwrap_or_else(|| ParseError::new("value is not a member of this domain", "<value>"))),
        }
    }

    /// Rebuilds `value`'s canonical picks into a fresh [`Gen`]. Per
    /// `spec.md` §3, the returned `Gen`'s `reply_list` is exactly `value`'s
    /// canonical encoding; `call_log` is the full structured trace of
    /// replaying it.
    ///
    /// # Errors
    ///
    /// Returns `value`'s [`ParseError`] if it isn't a member, or
    /// [`RegenerateError::Filtered`] if replaying its canonical picks
    /// doesn't rebuild a value (a program error, since canonical picks
    /// always should).
    pub fn regenerate(&self, value: &T) -> Result<Gen<T>, RegenerateError> {
        let picks = self.parse(value).map_err(RegenerateError::NotAMember)?;
        let mut responder = Playback::new(picks.clone());
        let mut pick = PickFunction::new(&mut responder);
        let rebuilt = pick
            .dispatch(&self.build)
            .map_err(|Filtered| RegenerateError::Filtered)?;
        let log = pick.into_log().into_log();
        Ok(Gen::new(self.build.clone(), picks, log, rebuilt))
    }
}

/// Failure mode of [`Domain::regenerate`].
#[derive(Debug)]
pub enum RegenerateError {
    /// `value` did not `pickify`.
    NotAMember(ParseError),
    /// Canonical picks didn't rebuild a value (program error).
    Filtered,
}

/// `int(min, max)`: a sign-then-magnitude encoding so the picks stay small
/// near zero regardless of how far `min`/`max` reach (`spec.md` §8 scenario
/// 2). Ranges that don't straddle zero collapse to a single direct pick.
///
/// # Errors
///
/// Returns [`PickError::InvalidRange`] if `min > max`.
pub fn int(name: impl Into<Rc<str>>, min: i32, max: i32) -> PickResult<Domain<i32>> {
    if min > max {
        return Err(PickError::InvalidRange { min, max });
    }
    let name = name.into();

    if min >= 0 || max <= 0 {
        let req = PickRequest::new(min, max)?;
        let opts = ScriptOpts {
            max_size: Some(req.size()),
            ..ScriptOpts::default()
        };
        let script = Script::make(name, move |pick| pick.pick(req.clone()), opts);
        return Domain::make(script, move |value, _| Some(vec![*value]));
    }

    let sign_req = PickRequest::must(0, 1);
    let nonneg_req = PickRequest::must(0, max);
    let neg_req = PickRequest::must(0, -min);
    let size = (i64::from(max) - i64::from(min) + 1) as u64;
    let opts = ScriptOpts {
        max_size: Some(size),
        ..ScriptOpts::default()
    };
    let script = Script::make(
        name,
        move |pick| {
            let sign = pick.pick(sign_req.clone())?;
            if sign == 0 {
                pick.pick(nonneg_req.clone())
            } else {
                Ok(-pick.pick(neg_req.clone())?)
            }
        },
        opts,
    );
    Domain::make(script, move |value, _| {
        if *value >= 0 {
            Some(vec![0, *value])
        } else {
            Some(vec![1, -*value])
        }
    })
}

/// `array(item, min, max)`: `min` fixed items with no gate pick, then each
/// additional item gated by a `1` continuation pick, then (only once at
/// least one extra item was taken, and the array could still grow) a `0`
/// terminator (`spec.md` §8 scenario 3). An array holding exactly `min`
/// items needs no terminator: replay past the end of its picks falls back
/// to the gate's own minimum, `0`, which is "stop" anyway.
///
/// # Errors
///
/// Returns [`PickError::InvalidRange`] if `min > max`.
pub fn array<T: Clone + PartialEq + 'static>(
    name: impl Into<Rc<str>>,
    item: Domain<T>,
    min: usize,
    max: usize,
) -> PickResult<Domain<Vec<T>>> {
    if min > max {
        return Err(PickError::InvalidRange {
            min: min as i32,
            max: max as i32,
        });
    }
    let name = name.into();
    let config = Config::default();
    let item_build = item.build.clone();
    let item_pickify = Rc::clone(&item.pickify);

    let script = Script::make(
        name,
        move |pick| {
            let mut out = Vec::with_capacity(min);
            for _ in 0..min {
                out.push(item_build.call(pick)?);
            }
            while out.len() < max {
                let gate_req = PickRequest::must(0, 1)
                    .with_bias(length_gate_bias(&config, out.len() - min));
                if pick.pick(gate_req)? == 0 {
                    break;
                }
                out.push(item_build.call(pick)?);
            }
            Ok(out)
        },
        ScriptOpts::default(),
    );

    Domain::make(script, move |values, send_err| {
        if values.len() < min || values.len() > max {
            send_err(ParseError::new(
                format!("array length must be within [{min}, {max}]"),
                values.len().to_string(),
            ));
            return None;
        }
        let mut picks = Vec::new();
        for (i, value) in values.iter().enumerate() {
            if i >= min {
                picks.push(1);
            }
            let mut nested = |err: ParseError| send_err(err.nest(format!("[{i}]")));
            picks.extend((item_pickify)(value, &mut nested)?);
        }
        let extra = values.len() - min;
        if extra > 0 && values.len() < max {
            picks.push(0);
        }
        Some(picks)
    })
}

/// `unique_array(item, length)`: `length` pairwise-distinct values drawn
/// from `item` (`spec.md` §8 scenario 4). Construction fails outright if
/// `item`'s domain is provably too small to hold `length` distinct values.
///
/// Distinctness is enforced by rejection: the dispatcher's accept-retry
/// loop backtracks into an alternative playout whenever a draw repeats an
/// earlier one. Because that backtracking needs an actual alternative to
/// retry into, the build is marked `lazy_init` so [`Domain::make`] skips
/// its usual from-scratch dry-run (which replays against a fixed, non-
/// backtracking responder and so cannot itself produce `length > 1`
/// distinct values).
///
/// # Errors
///
/// Returns [`PickError::InvalidRange`] if `item`'s `max_size` is known and
/// smaller than `length`.
pub fn unique_array<T: Clone + PartialEq + 'static>(
    name: impl Into<Rc<str>>,
    item: Domain<T>,
    length: usize,
) -> PickResult<Domain<Vec<T>>> {
    if let Some(card) = item.build.opts().max_size {
        if card < length as u64 {
            return Err(PickError::InvalidRange {
                min: length as i32,
                max: card as i32,
            });
        }
    }
    let name = name.into();
    let item_build = item.build.clone();
    let item_pickify = Rc::clone(&item.pickify);

    let opts = ScriptOpts {
        lazy_init: true,
        ..ScriptOpts::default()
    };
    let script = Script::make(
        name,
        move |pick| {
            let mut out: Vec<T> = Vec::with_capacity(length);
            while out.len() < length {
                let seen = out.clone();
                let candidate =
                    pick.dispatch_accepting(&item_build, &move |v: &T| !seen.contains(v))?;
                out.push(candidate);
            }
            Ok(out)
        },
        opts,
    );

    Domain::make(script, move |values, send_err| {
        if values.len() != length {
            send_err(ParseError::new(
                format!("expected exactly {length} values"),
                values.len().to_string(),
            ));
            return None;
        }
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                if values[i] == values[j] {
                    send_err(ParseError::new(
                        "not enough unique values",
                        format!("duplicate at indices {i} and {j}"),
                    ));
                    return None;
                }
            }
        }
        let mut picks = Vec::new();
        for value in values {
            let mut nested = |err: ParseError| send_err(err);
            picks.extend((item_pickify)(value, &mut nested)?);
        }
        Some(picks)
    })
}

/// `table(row, key, key_cardinality, length)`: `length` rows drawn from
/// `row`, pairwise-distinct under `key` (`spec.md` §8 scenario 6, §4.6
/// "Table behaves the same [as `unique_array`] with per-column uniqueness
/// tracked via per-key PickTree"). Unlike [`unique_array`], a
/// `key_cardinality` too small for `length` is a hard construction-time
/// error rather than a per-value `pickify` rejection, since the row shape
/// (and hence the key's cardinality) is known up front.
///
/// # Errors
///
/// Returns [`PickError::InvalidRange`] if `key_cardinality` is smaller
/// than `length`.
pub fn table<Row: Clone + PartialEq + 'static>(
    name: impl Into<Rc<str>>,
    row: Domain<Row>,
    key: impl Fn(&Row) -> i32 + 'static,
    key_cardinality: u64,
    length: usize,
) -> PickResult<Domain<Vec<Row>>> {
    if key_cardinality < length as u64 {
        return Err(PickError::InvalidRange {
            min: length as i32,
            max: key_cardinality as i32,
        });
    }
    let name = name.into();
    let row_build = row.build.clone();
    let row_pickify = Rc::clone(&row.pickify);
    let key = Rc::new(key);
    let key_for_build = Rc::clone(&key);

    let opts = ScriptOpts {
        lazy_init: true,
        ..ScriptOpts::default()
    };
    let script = Script::make(
        name,
        move |pick| {
            let mut out: Vec<Row> = Vec::with_capacity(length);
            while out.len() < length {
                let seen_keys: Vec<i32> = out.iter().map(|r| key_for_build(r)).collect();
                let key_for_accept = Rc::clone(&key_for_build);
                let candidate = pick.dispatch_accepting(&row_build, &move |r: &Row| {
                    !seen_keys.contains(&key_for_accept(r))
                })?;
                out.push(candidate);
            }
            Ok(out)
        },
        opts,
    );

    Domain::make(script, move |rows, send_err| {
        if rows.len() != length {
            send_err(ParseError::new(
                format!("expected exactly {length} rows"),
                rows.len().to_string(),
            ));
            return None;
        }
        for i in 0..rows.len() {
            for j in (i + 1)..rows.len() {
                if key(&rows[i]) == key(&rows[j]) {
                    send_err(ParseError::new(
                        "not enough unique keys",
                        format!("duplicate key at rows {i} and {j}"),
                    ));
                    return None;
                }
            }
        }
        let mut picks = Vec::new();
        for row_value in rows {
            let mut nested = |err: ParseError| send_err(err);
            picks.extend((row_pickify)(row_value, &mut nested)?);
        }
        Some(picks)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn int_round_trips_with_sign_magnitude_encoding() {
        let d = int("n", -3, 5).unwrap();
        assert_eq!(d.parse(&0).unwrap(), vec![0, 0]);
        assert_eq!(d.parse(&-1).unwrap(), vec![1, 1]);
        assert_eq!(d.parse(&5).unwrap(), vec![0, 5]);
        for v in -3..=5 {
            let picks = d.parse(&v).unwrap();
            let mut responder = Playback::new(picks);
            let mut pick = PickFunction::new(&mut responder);
            assert_eq!(pick.dispatch(d.build()), Ok(v));
        }
    }

    #[test]
    fn array_bounds_length() {
        let bit = int("bit", 0, 1).unwrap();
        let a = array("bits", bit, 2, 4).unwrap();
        assert_eq!(a.parse(&vec![1, 0]).unwrap(), vec![1, 0]);
        assert_eq!(a.parse(&vec![1, 0, 1]).unwrap(), vec![1, 0, 1, 1, 0]);
        assert!(a.parse(&vec![1, 0, 1, 0, 1]).is_err());
    }

    #[test]
    fn array_round_trips_variable_length() {
        let bit = int("bit", 0, 1).unwrap();
        let a = array("bits", bit, 2, 4).unwrap();
        for v in [vec![0, 0], vec![1, 0, 1], vec![1, 1, 0, 1]] {
            let picks = a.parse(&v).unwrap();
            let mut responder = Playback::new(picks);
            let mut pick = PickFunction::new(&mut responder);
            assert_eq!(pick.dispatch(a.build()).unwrap(), v);
        }
    }

    #[test]
    fn array_length_bias_is_advisory_only_under_random() {
        // The two-coin length bias only shapes what `Random` draws; it
        // never changes which lengths a canonical encoding can target, and
        // ordered/tree-walking responders ignore it entirely (confirmed by
        // `array_round_trips_variable_length` already replaying every
        // length through `Playback`).
        let bit = int("bit", 0, 1).unwrap();
        let a = array("bits", bit, 0, 20).unwrap();
        let mut responder = crate::responder::Random::new(11);
        let mut pick = PickFunction::new(&mut responder);
        let lengths: Vec<usize> = (0..50)
            .map(|_| pick.dispatch(a.build()).unwrap().len())
            .collect();
        assert!(lengths.iter().any(|&len| len < 20));
    }

    #[test]
    fn unique_array_rejects_oversized_length() {
        let b = int("bool", 0, 1).unwrap();
        assert!(unique_array("pair", b, 2).is_ok());
        let b2 = int("bool2", 0, 1).unwrap();
        assert!(unique_array("triple", b2, 3).is_err());
    }

    #[test]
    fn unique_array_round_trips_and_rejects_duplicates() {
        let b = int("bool", 0, 1).unwrap();
        let u = unique_array("pair", b, 2).unwrap();
        for v in [vec![0, 1], vec![1, 0]] {
            let picks = u.parse(&v).unwrap();
            let mut responder = Playback::new(picks);
            let mut pick = PickFunction::new(&mut responder);
            assert_eq!(pick.dispatch(u.build()).unwrap(), v);
        }
        assert!(u.parse(&vec![0, 0]).is_err());
    }

    #[test]
    fn table_rejects_length_over_key_cardinality() {
        let row = int("id", 1, 3).unwrap();
        assert!(table("rows", row, |id: &i32| *id, 3, 3).is_ok());
        let row2 = int("id2", 1, 3).unwrap();
        assert!(table("rows2", row2, |id: &i32| *id, 3, 4).is_err());
    }

    #[test]
    fn table_round_trips_distinct_keys() {
        let row = int("id", 1, 3).unwrap();
        let t = table("rows", row, |id: &i32| *id, 3, 3).unwrap();
        let value = vec![1, 2, 3];
        let picks = t.parse(&value).unwrap();
        let mut responder = Playback::new(picks);
        let mut pick = PickFunction::new(&mut responder);
        assert_eq!(pick.dispatch(t.build()).unwrap(), value);
        assert!(t.parse(&vec![1, 1, 2]).is_err());
    }
}
