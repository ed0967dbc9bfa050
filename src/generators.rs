// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A minimal generator library exercising the core end-to-end: `bit`,
//! `int`, `of`, `one_of`, `array`, `unique_array`, `ascii_string`, `table`,
//! and an `object!` record builder (`spec.md` §4.5/§4.6).
//!
//! These are thin wrappers over [`crate::script::Script`] and
//! [`crate::domain::Domain`] — no independent state, no caching beyond what
//! `Script` already allows.

use crate::domain::{self, Domain};
use crate::error::PickResult;
use crate::pick::PickRequest;
use crate::script::{Script, ScriptOpts};
use std::rc::Rc;

/// A single fair coin flip.
#[must_use]
pub fn bit() -> Script<bool> {
    Script::make(
        "bit",
        |pick| Ok(pick.pick(PickRequest::must(0, 1))? == 1),
        ScriptOpts::default(),
    )
}

/// An integer uniformly drawn from `[min, max]`, sign-magnitude encoded
/// when the range straddles zero (see [`domain::int`]).
///
/// # Errors
///
/// Returns [`crate::error::PickError::InvalidRange`] if `min > max`.
pub fn int(min: i32, max: i32) -> PickResult<Script<i32>> {
    Ok(domain::int("int", min, max)?.build().clone())
}

/// Chooses uniformly among `values`.
///
/// # Errors
///
/// Returns [`crate::error::PickError::EmptyUnion`] if `values` is empty.
pub fn of<T: Clone + 'static>(values: Vec<T>) -> PickResult<Script<T>> {
    Script::of("of", values)
}

/// Chooses among `cases`, each paired with its relative selection weight.
///
/// # Errors
///
/// Returns [`crate::error::PickError::EmptyUnion`] if `cases` is empty, or
/// [`crate::error::PickError::NegativeWeight`] if any weight is negative.
pub fn one_of<T: 'static>(cases: Vec<(f64, Script<T>)>) -> PickResult<Script<T>> {
    let cases = cases
        .into_iter()
        .map(|(weight, script)| script.with_weight(weight))
        .collect();
    Script::one_of("one_of", cases)
}

/// A variable-length array of `item`s, between `min` and `max` long.
///
/// # Errors
///
/// Returns [`crate::error::PickError::InvalidRange`] if `min > max`.
pub fn array<T: Clone + PartialEq + 'static>(
    item: Domain<T>,
    min: usize,
    max: usize,
) -> PickResult<Script<Vec<T>>> {
    Ok(domain::array("array", item, min, max)?.build().clone())
}

/// `length` pairwise-distinct `item`s.
///
/// # Errors
///
/// Returns [`crate::error::PickError::InvalidRange`] if `item`'s known
/// cardinality is smaller than `length`.
pub fn unique_array<T: Clone + PartialEq + 'static>(
    item: Domain<T>,
    length: usize,
) -> PickResult<Script<Vec<T>>> {
    Ok(domain::unique_array("unique_array", item, length)?.build().clone())
}

/// `length` rows drawn from `row`, pairwise-distinct under `key`, whose
/// cardinality is bounded by `key_cardinality`.
///
/// # Errors
///
/// Returns [`crate::error::PickError::InvalidRange`] if `key_cardinality`
/// is smaller than `length`.
pub fn table<Row: Clone + PartialEq + 'static>(
    row: Domain<Row>,
    key: impl Fn(&Row) -> i32 + 'static,
    key_cardinality: u64,
    length: usize,
) -> PickResult<Script<Vec<Row>>> {
    Ok(domain::table("table", row, key, key_cardinality, length)?
        .build()
        .clone())
}

/// A string of `min` to `max` printable ASCII characters (0x20..=0x7e).
///
/// # Errors
///
/// Returns [`crate::error::PickError::InvalidRange`] if `min > max`.
pub fn ascii_string(min: usize, max: usize) -> PickResult<Script<String>> {
    let byte = domain::int("ascii_byte", 0x20, 0x7e)?;
    let chars = domain::array("ascii_chars", byte, min, max)?;
    Ok(chars
        .build()
        .map(|bytes: Vec<i32>| bytes.into_iter().map(|b| b as u8 as char).collect()))
}

/// Combines two scripts into one producing their pair, in dispatch order.
/// The building block `object!` nests to combine more than two fields.
pub fn pair<A: 'static, B: 'static>(
    name: impl Into<Rc<str>>,
    a: Script<A>,
    b: Script<B>,
) -> Script<(A, B)> {
    Script::make(
        name,
        move |pick| {
            let x = pick.dispatch(&a)?;
            let y = pick.dispatch(&b)?;
            Ok((x, y))
        },
        ScriptOpts::default(),
    )
}

/// Builds a record script out of field scripts, right-nesting them into
/// tuples: `object!("point"; x, y, z)` is a `Script<(X, (Y, Z))>`.
#[macro_export]
macro_rules! object {
    ($name:expr; $a:expr $(,)?) => {
        $a
    };
    ($name:expr; $a:expr, $b:expr $(,)?) => {
        $crate::generators::pair($name, $a, $b)
    };
    ($name:expr; $a:expr, $b:expr, $($rest:expr),+ $(,)?) => {
        $crate::generators::pair($name, $a, $crate::object!($name; $b, $($rest),+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::PickFunction;
    use crate::responder::Playback;
    use test_log::test;

    fn run<T: 'static>(script: &Script<T>, replies: Vec<i32>) -> T {
        let mut responder = Playback::new(replies);
        let mut pick = PickFunction::new(&mut responder);
        pick.dispatch(script).expect("build should not filter")
    }

    #[test]
    fn bit_is_a_single_coin_flip() {
        assert!(!run(&bit(), vec![0]));
        assert!(run(&bit(), vec![1]));
    }

    #[test]
    fn int_spans_its_range() {
        let script = int(-2, 2).unwrap();
        assert_eq!(run(&script, vec![0, 0]), 0);
        assert_eq!(run(&script, vec![1, 2]), -2);
    }

    #[test]
    fn one_of_respects_weights() {
        let low = of(vec![0]).unwrap().with_weight(1.0);
        let high = of(vec![1]).unwrap().with_weight(9.0);
        let script = one_of(vec![(1.0, low), (9.0, high)]).unwrap();
        assert_eq!(run(&script, vec![i32::MAX]), 1);
    }

    #[test]
    fn array_of_bits_round_trips() {
        let bit_domain = domain::int("bit", 0, 1).unwrap();
        let script = array(bit_domain, 1, 3).unwrap();
        assert_eq!(run(&script, vec![0, 1, 1]), vec![0, 1]);
    }

    #[test]
    fn unique_array_never_repeats() {
        // The rejection-sampling retry inside `unique_array` needs a
        // responder that can actually back into an alternative playout on
        // a duplicate; plain `Random` has none (it only moves forward), so
        // this drives it with `TreeWalking` instead.
        let item = domain::int("item", 0, 2).unwrap();
        let script = unique_array(item, 3).unwrap();
        let mut responder = crate::responder::TreeWalking::new();
        let mut pick = PickFunction::new(&mut responder);
        let values = pick.dispatch(&script).unwrap();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn ascii_string_stays_printable() {
        let script = ascii_string(1, 4).unwrap();
        let mut responder = crate::responder::Random::new(3);
        let mut pick = PickFunction::new(&mut responder);
        let s = pick.dispatch(&script).unwrap();
        assert!(!s.is_empty());
        assert!(s.chars().all(|c| c.is_ascii_graphic() || c == ' '));
    }

    #[test]
    fn object_macro_nests_fields_into_tuples() {
        let x = of(vec![1]).unwrap();
        let y = of(vec![2]).unwrap();
        let z = of(vec![3]).unwrap();
        let point = object!("point"; x, y, z);
        assert_eq!(run(&point, vec![0, 0, 0]), (1, (2, 3)));
    }
}
