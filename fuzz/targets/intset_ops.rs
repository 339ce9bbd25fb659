#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use kvprim::IntSet;

#[derive(Debug, Arbitrary)]
enum Op {
    Add(i64),
    Remove(i64),
    Find(i64),
    Range(i64, i64),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut set = IntSet::new();
    let mut model = BTreeSet::new();

    for op in ops {
        match op {
            Op::Add(v) => assert_eq!(set.add(v).is_ok(), model.insert(v)),
            Op::Remove(v) => assert_eq!(set.remove(v).is_ok(), model.remove(&v)),
            Op::Find(v) => assert_eq!(set.find(v), model.contains(&v)),
            Op::Range(a, b) => {
                let got: Vec<i64> = set.iter_range(a, b).collect();
                let expected: Vec<i64> = if a <= b {
                    model.range(a..=b).copied().collect()
                } else {
                    Vec::new()
                };
                assert_eq!(got, expected);
            }
        }
    }

    set.debug_assert_invariants();
    assert!(set.iter().eq(model.iter().copied()));
});
