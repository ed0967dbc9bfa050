// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `spec.md` §8 scenario 4: `unique_array` over a domain too small to hold
//! the requested length is rejected; a length it can hold round-trips with
//! all values distinct.
//!
//! A two-valued domain (booleans encoded as `int(0, 1)`) can hold at most
//! two distinct values, so `length = 3` is provably impossible. This
//! implementation rejects that case at domain *construction* time (via the
//! item domain's statically known `max_size`) rather than per value at
//! `pickify` time; see `DESIGN.md` for why.

use pickscript::domain;
use pickscript::responder::TreeWalking;
use pickscript::{PickFunction, PickResult};

fn bool_item() -> domain::Domain<i32> {
    domain::int("bool", 0, 1).unwrap()
}

#[test]
fn length_exceeding_item_cardinality_is_rejected_at_construction() {
    let result: PickResult<domain::Domain<Vec<i32>>> =
        domain::unique_array("flags", bool_item(), 3);
    assert!(result.is_err());
}

#[test]
fn length_within_item_cardinality_round_trips_distinct_values() {
    let d = domain::unique_array("flags", bool_item(), 2).unwrap();

    for values in [vec![0, 1], vec![1, 0]] {
        let picks = d.parse(&values).unwrap();
        let mut responder = pickscript::responder::Playback::new(picks);
        let mut pick = PickFunction::new(&mut responder);
        assert_eq!(pick.dispatch(d.build()), Ok(values));
    }
}

#[test]
fn building_with_a_backtracking_responder_yields_distinct_values() {
    let d = domain::unique_array("flags", bool_item(), 2).unwrap();
    let mut responder = TreeWalking::new();
    let mut pick = PickFunction::new(&mut responder);
    let values = pick.dispatch(d.build()).unwrap();
    assert_ne!(values[0], values[1]);
}

#[test]
fn duplicate_values_fail_to_pickify() {
    let d = domain::unique_array("flags", bool_item(), 2).unwrap();
    let err = d.parse(&vec![0, 0]).unwrap_err();
    assert!(err.message.contains("not enough unique values"));
}
