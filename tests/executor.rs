#![deny(warnings, rust_2018_idioms)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::mem;

use futures::FutureExt;
use shuffler::hook::{yield_now, ExecutorHook};
use shuffler::interleave::n_interleavings;
use shuffler::ExhaustiveStrategy;

#[test]
fn basic_case() {
    let mut hook = ExecutorHook::new(ExhaustiveStrategy::new());
    let output = RefCell::new(Vec::new());
    let mut interleavings = HashSet::new();

    while !hook.strategy_completed() {
        {
            let mut active = hook.activate();
            let tasks = ["A", "B"]
                .iter()
                .map(|task_id| {
                    let output = &output;
                    async move {
                        output.borrow_mut().push(format!("{}-1", task_id));
                        yield_now().await;
                        output.borrow_mut().push(format!("{}-2", task_id));
                    }
                    .boxed_local()
                })
                .collect();
            active.run_pass(tasks);
        }

        interleavings.insert(mem::take(&mut *output.borrow_mut()));
        hook.finish_sequence();
    }

    let expected: HashSet<Vec<String>> = [
        ["A-1", "B-1", "A-2", "B-2"],
        ["A-1", "B-1", "B-2", "A-2"],
        ["A-1", "A-2", "B-1", "B-2"],
        ["B-1", "A-1", "B-2", "A-2"],
        ["B-1", "B-2", "A-1", "A-2"],
        ["B-1", "A-1", "A-2", "B-2"],
    ]
    .iter()
    .map(|pass| pass.iter().map(|op| op.to_string()).collect())
    .collect();
    assert_eq!(interleavings, expected);
}

fn check_interleaving_count(ops_counts: &[usize]) {
    let mut hook = ExecutorHook::new(ExhaustiveStrategy::new());
    let output = RefCell::new(Vec::new());
    let mut interleavings = HashSet::new();

    while !hook.strategy_completed() {
        {
            let mut active = hook.activate();
            let tasks = ops_counts
                .iter()
                .enumerate()
                .map(|(task_ix, &n_ops)| {
                    let output = &output;
                    async move {
                        for op_ix in 0..n_ops {
                            yield_now().await;
                            output.borrow_mut().push((task_ix, op_ix));
                        }
                    }
                    .boxed_local()
                })
                .collect();
            active.run_pass(tasks);
        }

        interleavings.insert(mem::take(&mut *output.borrow_mut()));
        hook.finish_sequence();
    }

    assert_eq!(interleavings.len(), n_interleavings(ops_counts));
}

#[test]
fn count_one_and_three() {
    check_interleaving_count(&[1, 3]);
}

#[test]
fn count_two_by_two() {
    check_interleaving_count(&[2, 2]);
}

#[test]
fn count_three_tasks() {
    check_interleaving_count(&[1, 2, 1]);
}

#[test]
fn inactive_hook_polls_fifo() {
    let mut hook = ExecutorHook::new(ExhaustiveStrategy::new());
    let output = RefCell::new(Vec::new());

    let tasks = (0..2)
        .map(|task_ix| {
            let output = &output;
            async move {
                output.borrow_mut().push((task_ix, 0));
                yield_now().await;
                output.borrow_mut().push((task_ix, 1));
            }
            .boxed_local()
        })
        .collect();
    hook.run_pass(tasks);

    // Round-robin: every yield re-queues behind the other task.
    assert_eq!(*output.borrow(), [(0, 0), (1, 0), (0, 1), (1, 1)]);
    assert!(hook.finish_sequence().is_empty());
}
