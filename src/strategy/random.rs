use std::collections::BTreeSet;
use std::mem;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::strategy::{Strategy, TaskId};

const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Samples interleavings uniformly at random under a fixed pass budget.
///
/// Unlike [`ExhaustiveStrategy`] the sampled sequences carry no coverage
/// guarantee and may repeat; the strategy simply reports completion after
/// `max_iterations` passes. Useful when the exhaustive space is too large to
/// enumerate. Seed the generator to replay a failing run.
///
/// [`ExhaustiveStrategy`]: crate::strategy::ExhaustiveStrategy
#[derive(Debug)]
pub struct RandomStrategy<T> {
    max_iterations: usize,
    rng: SmallRng,
    counter: usize,
    curr_path: Vec<T>,
}

impl<T: TaskId> RandomStrategy<T> {
    /// Creates a strategy with the default budget of 100 passes.
    pub fn new() -> RandomStrategy<T> {
        RandomStrategy::with_max_iterations(DEFAULT_MAX_ITERATIONS)
    }

    /// Creates a strategy that completes after `max_iterations` passes.
    pub fn with_max_iterations(max_iterations: usize) -> RandomStrategy<T> {
        RandomStrategy {
            max_iterations,
            rng: SmallRng::from_entropy(),
            counter: 0,
            curr_path: Vec::new(),
        }
    }

    /// Re-seeds the generator so a sampled run can be reproduced.
    pub fn seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }
}

impl<T: TaskId> Default for RandomStrategy<T> {
    fn default() -> RandomStrategy<T> {
        RandomStrategy::new()
    }
}

impl<T: TaskId> Strategy<T> for RandomStrategy<T> {
    fn choose_next(&mut self, options: &BTreeSet<T>) -> T {
        assert!(!options.is_empty(), "empty candidate set");

        let index = self.rng.gen_range(0..options.len());
        let selected = options
            .iter()
            .nth(index)
            .cloned()
            .expect("[shuffler internal bug] sampled index out of range");

        self.curr_path.push(selected.clone());
        selected
    }

    fn finish_sequence(&mut self) -> Vec<T> {
        self.counter += 1;
        mem::take(&mut self.curr_path)
    }

    fn is_completed(&self) -> bool {
        self.counter >= self.max_iterations
    }

    fn reset(&mut self) {
        self.counter = 0;
        self.curr_path.clear();
    }
}
