// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `spec.md` §8 scenario 1: ordered playouts over three bit picks visit
//! every sequence in {0,1}^3 exactly once, starting from all-zeros.

use pickscript::{OrderedPlayouts, PickRequest, PickResponder};

#[test]
fn enumerates_every_bit_triple_in_a_stable_order() {
    let mut playouts = OrderedPlayouts::new(None);
    let mut order = Vec::new();
    while let Some(walker) = playouts.next_playout() {
        let path: Vec<i32> = (0..3)
            .map(|_| walker.next_pick(&PickRequest::must(0, 1)).unwrap())
            .collect();
        order.push(path);
    }

    // Last-pick-first backtracking: the rightmost bit cycles fastest.
    assert_eq!(
        order,
        vec![
            vec![0, 0, 0],
            vec![0, 0, 1],
            vec![0, 1, 0],
            vec![0, 1, 1],
            vec![1, 0, 0],
            vec![1, 0, 1],
            vec![1, 1, 0],
            vec![1, 1, 1],
        ]
    );
    assert!(playouts.is_exhausted());
}
