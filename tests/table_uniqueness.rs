// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `spec.md` §8 scenario 6: `table` draws rows keyed by a field, rejecting
//! any two rows that share a key. A `key_cardinality` too small for the
//! requested length is a construction-time error, mirroring
//! [`unique_array`]'s cardinality check for the same reason (see
//! `DESIGN.md`).

use pickscript::domain;
use pickscript::responder::TreeWalking;
use pickscript::{PickFunction, PickResult};

fn id_row() -> domain::Domain<i32> {
    domain::int("id", 1, 3).unwrap()
}

#[test]
fn length_exceeding_key_cardinality_is_rejected_at_construction() {
    let result: PickResult<domain::Domain<Vec<i32>>> =
        domain::table("rows", id_row(), |r| *r, 3, 4);
    assert!(result.is_err());
}

#[test]
fn rows_each_use_a_distinct_key() {
    let d = domain::table("rows", id_row(), |r| *r, 3, 3).unwrap();
    let mut responder = TreeWalking::new();
    let mut pick = PickFunction::new(&mut responder);
    let rows = pick.dispatch(d.build()).unwrap();

    assert_eq!(rows.len(), 3);
    let mut sorted = rows.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2, 3]);
}

#[test]
fn duplicate_keys_fail_to_pickify() {
    let d = domain::table("rows", id_row(), |r| *r, 3, 3).unwrap();
    let err = d.parse(&vec![1, 1, 2]).unwrap_err();
    assert!(err.message.contains("not enough unique keys"));
}
