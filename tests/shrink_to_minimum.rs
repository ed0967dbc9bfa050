// Copyright (c) 2024-present, the pickscript authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `spec.md` §8 scenario 5: a property `v < 100` over `int(0, 1000)`,
//! given a failing value found at `v = 734`, shrinks to the threshold
//! `v = 100`.

use pickscript::dispatch::PickFunction;
use pickscript::responder::Playback;
use pickscript::shrink::Shrinker;

#[test]
fn shrinks_a_failing_value_to_the_property_threshold() {
    let n = pickscript::domain::int("n", 0, 1000).unwrap();

    let mut responder = Playback::new(n.parse(&734).unwrap());
    let mut pick = PickFunction::new(&mut responder);
    let value = pick.dispatch(n.build()).unwrap();
    assert_eq!(value, 734);
    let log = pick.into_log().into_log();

    let is_failing = |v: &i32| *v >= 100;
    let shrunk = Shrinker::new(n.build().clone(), &is_failing).run(&log);

    assert_eq!(*shrunk.value(), 100);
}
