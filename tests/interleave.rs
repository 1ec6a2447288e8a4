#![deny(warnings, rust_2018_idioms)]

use std::collections::BTreeSet;

use shuffler::interleave::{all_interleavings, n_interleavings};

#[test]
fn counts_match_closed_form() {
    assert_eq!(n_interleavings(&[1]), 1);
    assert_eq!(n_interleavings(&[1, 1]), 2);
    assert_eq!(n_interleavings(&[1, 2]), 3);
    assert_eq!(n_interleavings(&[2, 2]), 6);
    assert_eq!(n_interleavings(&[3, 2]), 10);
    assert_eq!(n_interleavings(&[3, 3]), 20);
    assert_eq!(n_interleavings(&[2, 2, 2]), 90);
    assert_eq!(n_interleavings(&[1, 2, 3]), 60);
}

#[test]
fn enumerates_all_merges() {
    let merges = all_interleavings(&[vec!["a1", "a2"], vec!["b1"]]);
    assert_eq!(
        merges,
        vec![
            vec!["a1", "a2", "b1"],
            vec!["a1", "b1", "a2"],
            vec!["b1", "a1", "a2"],
        ],
    );
}

#[test]
fn merges_are_distinct_and_counted() {
    let merges = all_interleavings(&[vec![0, 1], vec![10, 11], vec![20]]);

    assert_eq!(merges.len(), n_interleavings(&[2, 2, 1]));

    let distinct: BTreeSet<_> = merges.iter().collect();
    assert_eq!(distinct.len(), merges.len());
}

#[test]
#[should_panic(expected = "at least one operation count")]
fn rejects_empty_input() {
    n_interleavings(&[]);
}

#[test]
#[should_panic(expected = "must be positive")]
fn rejects_zero_counts() {
    n_interleavings(&[1, 0]);
}
