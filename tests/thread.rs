#![deny(warnings, rust_2018_idioms)]

use std::collections::BTreeSet;
use std::mem;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use shuffler::interleave::all_interleavings;
use shuffler::{ExhaustiveStrategy, ThreadShuffler};

type Shuffler = ThreadShuffler<String, ExhaustiveStrategy<String>>;
type Output = Mutex<Vec<(usize, usize)>>;

// Generous straggler bound: the tasks do no real work between yield points,
// but thread spawn latency on a loaded machine must not look like a
// straggler.
const MAX_WAIT_FOR: Duration = Duration::from_millis(250);

fn new_shuffler(pool_size: usize) -> Shuffler {
    ThreadShuffler::with_max_wait_for(pool_size, ExhaustiveStrategy::new(), MAX_WAIT_FOR)
}

fn run_tasks(shuffler: &Shuffler, ops_counts: &[usize], output: &Output) {
    thread::scope(|scope| {
        for (task_ix, &n_ops) in ops_counts.iter().enumerate() {
            scope.spawn(move || {
                for op_ix in 0..n_ops {
                    let _op = shuffler.shuffle(format!("Task-{}", task_ix));
                    output.lock().unwrap().push((task_ix, op_ix));
                }
                shuffler.decrement_pool_size();
            });
        }
    });
}

fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort();
    items
}

fn check_exhaustive(ops_counts: &[usize]) {
    let expected_interleavings = all_interleavings(
        &ops_counts
            .iter()
            .enumerate()
            .map(|(task_ix, &n_ops)| (0..n_ops).map(|op_ix| (task_ix, op_ix)).collect())
            .collect::<Vec<Vec<_>>>(),
    );
    let expected_sequences = all_interleavings(
        &ops_counts
            .iter()
            .enumerate()
            .map(|(task_ix, &n_ops)| vec![format!("Task-{}", task_ix); n_ops])
            .collect::<Vec<_>>(),
    );

    let shuffler = new_shuffler(ops_counts.len());
    let output = Output::default();
    let total: usize = ops_counts.iter().sum();

    let mut interleavings = Vec::new();
    let mut sequences = Vec::new();
    while !shuffler.strategy_completed() {
        run_tasks(&shuffler, ops_counts, &output);

        let interleaving = mem::take(&mut *output.lock().unwrap());
        let sequence = shuffler.finish_sequence();

        assert_eq!(sequence.len(), total);
        assert_eq!(interleaving.len(), total);
        assert_eq!(interleaving.iter().collect::<BTreeSet<_>>().len(), total);

        interleavings.push(interleaving);
        sequences.push(sequence);
    }

    assert_eq!(sorted(interleavings), sorted(expected_interleavings));
    assert_eq!(sorted(sequences), sorted(expected_sequences));
}

#[test]
fn exhaustive_single_task() {
    check_exhaustive(&[1]);
}

#[test]
fn exhaustive_two_single_op_tasks() {
    check_exhaustive(&[1, 1]);
}

#[test]
fn exhaustive_one_and_two() {
    check_exhaustive(&[1, 2]);
}

#[test]
fn exhaustive_two_by_two() {
    check_exhaustive(&[2, 2]);
}

#[test]
fn exhaustive_three_and_two() {
    check_exhaustive(&[3, 2]);
}

#[test]
fn exhaustive_three_by_three() {
    check_exhaustive(&[3, 3]);
}

#[test]
fn exhaustive_three_tasks() {
    check_exhaustive(&[2, 2, 2]);
}

#[test]
fn exhaustive_asymmetric() {
    check_exhaustive(&[1, 2, 3]);
}

#[test]
fn two_single_op_tasks() {
    let shuffler = new_shuffler(2);

    let mut sequences = BTreeSet::new();
    while !shuffler.strategy_completed() {
        thread::scope(|scope| {
            for task_id in ["A", "B"] {
                let shuffler = &shuffler;
                scope.spawn(move || {
                    let _op = shuffler.shuffle(task_id.to_string());
                    drop(_op);
                    shuffler.decrement_pool_size();
                });
            }
        });
        sequences.insert(shuffler.finish_sequence());
    }

    let expected: BTreeSet<Vec<String>> = [["A", "B"], ["B", "A"]]
        .iter()
        .map(|pass| pass.iter().map(|task| task.to_string()).collect())
        .collect();
    assert_eq!(sequences, expected);
}

#[test]
fn reset_replays_identical_passes() {
    let shuffler = new_shuffler(2);
    let output = Output::default();

    let mut first = Vec::new();
    while !shuffler.strategy_completed() {
        run_tasks(&shuffler, &[1, 2], &output);
        output.lock().unwrap().clear();
        first.push(shuffler.finish_sequence());
    }

    shuffler.reset();
    assert!(!shuffler.strategy_completed());

    let mut second = Vec::new();
    while !shuffler.strategy_completed() {
        run_tasks(&shuffler, &[1, 2], &output);
        output.lock().unwrap().clear();
        second.push(shuffler.finish_sequence());
    }

    // Depth-first order is deterministic, so the replay matches pass for
    // pass.
    assert_eq!(first, second);
}

#[test]
fn explore_collects_every_pass() {
    let shuffler = new_shuffler(2);
    let output = Output::default();

    let sequences = shuffler::explore(&shuffler, || {
        run_tasks(&shuffler, &[2, 2], &output);
        output.lock().unwrap().clear();
    });

    assert_eq!(sequences.len(), 6);
    assert!(shuffler.strategy_completed());
}
