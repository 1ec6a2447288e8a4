//! Interleaving combinatorics.
//!
//! Closed-form counts and exhaustive enumerations of the ways to merge
//! ordered operation sequences. These double as test oracles for the
//! exhaustive strategy: a completed exploration must produce exactly
//! [`n_interleavings`] sequences, and their multiset must equal
//! [`all_interleavings`] of the per-task operation lists.

/// Returns the number of distinct interleavings of sequences with the given
/// lengths: the multinomial coefficient `(Σn)! / Πn!`.
///
/// # Panics
///
/// Panics if `ops_counts` is empty or contains a zero.
pub fn n_interleavings(ops_counts: &[usize]) -> usize {
    assert!(!ops_counts.is_empty(), "at least one operation count required");
    assert!(
        ops_counts.iter().all(|&n_ops| n_ops > 0),
        "operation counts must be positive",
    );

    // Running product of binomial coefficients rather than raw factorials;
    // the accumulator is a multinomial at every step, so each division is
    // exact and overflow is deferred as long as possible.
    let mut total = 0;
    let mut count: usize = 1;
    for &n_ops in ops_counts {
        for taken in 1..=n_ops {
            total += 1;
            count = count * total / taken;
        }
    }
    count
}

/// Enumerates every way to merge the given sequences while preserving the
/// order within each sequence.
///
/// # Panics
///
/// Panics if `ops` is empty or contains an empty sequence.
pub fn all_interleavings<T: Clone>(ops: &[Vec<T>]) -> Vec<Vec<T>> {
    let mut result = Vec::new();
    let mut taken = vec![0; ops.len()];
    let mut current = Vec::with_capacity(ops.iter().map(Vec::len).sum());
    generate(ops, &mut taken, &mut current, &mut result);

    let lens: Vec<usize> = ops.iter().map(Vec::len).collect();
    assert_eq!(
        result.len(),
        n_interleavings(&lens),
        "[shuffler internal bug] enumeration disagrees with the closed form",
    );
    result
}

fn generate<T: Clone>(
    ops: &[Vec<T>],
    taken: &mut Vec<usize>,
    current: &mut Vec<T>,
    result: &mut Vec<Vec<T>>,
) {
    let mut exhausted = 0;
    for ix in 0..ops.len() {
        if taken[ix] < ops[ix].len() {
            current.push(ops[ix][taken[ix]].clone());
            taken[ix] += 1;
            generate(ops, taken, current, result);
            taken[ix] -= 1;
            current.pop();
        } else {
            exhausted += 1;
        }
    }

    if exhausted == ops.len() {
        result.push(current.clone());
    }
}
