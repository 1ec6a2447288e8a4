//! Exploration strategies.
//!
//! A strategy owns the scheduling decisions of an exploration: at every
//! yield point it is handed the set of tasks currently waiting and picks the
//! one to release. [`ExhaustiveStrategy`] enumerates every distinct ordering
//! exactly once; [`RandomStrategy`] samples orderings under a fixed pass
//! budget.

mod exhaustive;
pub use self::exhaustive::ExhaustiveStrategy;

mod random;
pub use self::random::RandomStrategy;

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

/// Identity of one task, stable across every pass of an exploration.
///
/// The exhaustive strategy keys its decision tree on these values, so
/// equality and ordering must not change between passes. Implemented for
/// anything clonable, totally ordered, and hashable; strings and small
/// integers are the usual choices.
pub trait TaskId: Clone + Ord + Hash + fmt::Debug {}

impl<T: Clone + Ord + Hash + fmt::Debug> TaskId for T {}

/// Chooses which pending task runs next and tracks how far the exploration
/// has progressed.
///
/// A strategy is driven one pass at a time: a series of [`choose_next`]
/// calls followed by one [`finish_sequence`] call, repeated until
/// [`is_completed`] reports that the exploration budget is exhausted.
///
/// [`choose_next`]: Strategy::choose_next
/// [`finish_sequence`]: Strategy::finish_sequence
/// [`is_completed`]: Strategy::is_completed
pub trait Strategy<T: TaskId> {
    /// Picks one task out of `options` to release from the current yield
    /// point.
    ///
    /// # Panics
    ///
    /// Panics if `options` is empty, or if the candidate set is inconsistent
    /// with an earlier pass at the same decision point.
    fn choose_next(&mut self, options: &BTreeSet<T>) -> T;

    /// Closes the current pass, returning the tasks chosen during it in
    /// release order, and advances the internal state so the next pass can
    /// diverge.
    fn finish_sequence(&mut self) -> Vec<T>;

    /// True once the exploration budget is exhausted.
    fn is_completed(&self) -> bool;

    /// Returns the strategy to a state equivalent to a fresh instance.
    fn reset(&mut self);
}
