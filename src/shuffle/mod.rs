//! Rendezvous shufflers.
//!
//! A shuffler converts yield points in user code into scheduling choices.
//! Each task wraps every operation in a [`shuffle`] block; on entry the task
//! parks, and once every live task has arrived (or a bounded wait for
//! stragglers elapses) the strategy releases exactly one of them. Releases
//! are serialized: the next one happens only after the previously released
//! task has left its block, so the recorded sequence matches the order user
//! code observes.
//!
//! [`ThreadShuffler`] parks OS threads on a condition-variable monitor;
//! [`AsyncShuffler`] parks cooperative tasks on notify pulses. Both drive the
//! same pool state and differ only in their wait/pulse primitive.
//!
//! [`shuffle`]: ThreadShuffler::shuffle

mod thread;
pub use self::thread::{ShuffleGuard, ThreadShuffler};

mod future;
pub use self::future::{AsyncShuffleGuard, AsyncShuffler};

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::trace;

use crate::strategy::{Strategy, TaskId};

/// How long a release waits for stragglers before deciding from a partial
/// pool.
pub(crate) const DEFAULT_MAX_WAIT_FOR: Duration = Duration::from_millis(20);

/// Pool state shared by both shuffler flavors.
///
/// Every transition runs with the owning shuffler's lock held, so the wait
/// predicate observes `pending` and `cur_pool_size` atomically with the
/// pulses that re-evaluate it.
pub(crate) struct Pool<T, S> {
    /// Tasks currently parked at a yield point.
    pending: BTreeSet<T>,
    /// Tasks still alive this pass.
    cur_pool_size: usize,
    /// The previously released task has left its shuffle block; the next
    /// release may proceed.
    op_finished: bool,
    strategy: S,
}

impl<T: TaskId, S: Strategy<T>> Pool<T, S> {
    pub(crate) fn new(pool_size: usize, strategy: S) -> Pool<T, S> {
        Pool {
            pending: BTreeSet::new(),
            cur_pool_size: pool_size,
            op_finished: true,
            strategy,
        }
    }

    /// Parks `task_id` at the current yield point.
    pub(crate) fn join(&mut self, task_id: &T) {
        self.pending.insert(task_id.clone());
        trace!(task = ?task_id, pending = self.pending.len(), "parked");
    }

    /// Wait-phase predicate: the task has been released, or enough tasks
    /// have arrived to decide.
    pub(crate) fn can_decide(&self, task_id: &T) -> bool {
        !self.pending.contains(task_id) || self.pending.len() >= self.cur_pool_size
    }

    pub(crate) fn is_released(&self, task_id: &T) -> bool {
        !self.pending.contains(task_id)
    }

    /// Consumes the release interlock if it is set.
    pub(crate) fn try_consume_op_finished(&mut self) -> bool {
        let was_set = self.op_finished;
        self.op_finished = false;
        was_set
    }

    pub(crate) fn set_op_finished(&mut self) {
        self.op_finished = true;
    }

    /// Asks the strategy for the next task and removes it from the pool.
    pub(crate) fn release_one(&mut self) {
        let released = self.strategy.choose_next(&self.pending);
        trace!(task = ?released, "released");
        self.pending.remove(&released);
    }

    pub(crate) fn decrement(&mut self) {
        assert!(
            self.cur_pool_size > 0,
            "pool size underflow: more `decrement_pool_size` calls than live tasks",
        );
        self.cur_pool_size -= 1;
        trace!(cur_pool_size = self.cur_pool_size, "task finished");
    }

    /// Closes the pass: re-arms the pool for `pool_size` tasks and returns
    /// the strategy's sequence.
    pub(crate) fn finish_sequence(&mut self, pool_size: usize) -> Vec<T> {
        self.cur_pool_size = pool_size;
        self.strategy.finish_sequence()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.strategy.is_completed()
    }

    pub(crate) fn reset(&mut self, pool_size: usize) {
        self.cur_pool_size = pool_size;
        self.op_finished = true;
        self.strategy.reset();
    }
}
