use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::shuffle::{Pool, DEFAULT_MAX_WAIT_FOR};
use crate::strategy::{Strategy, TaskId};

/// Shuffler flavor for tasks running on OS threads.
///
/// The pool state lives under a single mutex; `pool_changed` and
/// `op_finished` are the monitor's condition variables. Arrival, the quorum
/// check, and the release all happen with the lock held, so a waiter can
/// never miss the pulse that satisfies its predicate.
pub struct ThreadShuffler<T, S> {
    pool: Mutex<Pool<T, S>>,
    pool_changed: Condvar,
    op_finished: Condvar,
    pool_size: usize,
    max_wait_for: Duration,
}

impl<T: TaskId, S: Strategy<T>> ThreadShuffler<T, S> {
    /// Creates a shuffler for `pool_size` cooperating tasks.
    pub fn new(pool_size: usize, strategy: S) -> ThreadShuffler<T, S> {
        ThreadShuffler::with_max_wait_for(pool_size, strategy, DEFAULT_MAX_WAIT_FOR)
    }

    /// Creates a shuffler with a custom straggler timeout.
    ///
    /// Raise the timeout when tasks do real work between yield points
    /// (blocking I/O, injected fuzz delays): a straggler that misses the
    /// rendezvous is not an error, but releasing from a partial pool elides
    /// interleavings the exploration would otherwise cover.
    pub fn with_max_wait_for(
        pool_size: usize,
        strategy: S,
        max_wait_for: Duration,
    ) -> ThreadShuffler<T, S> {
        ThreadShuffler {
            pool: Mutex::new(Pool::new(pool_size, strategy)),
            pool_changed: Condvar::new(),
            op_finished: Condvar::new(),
            pool_size,
            max_wait_for,
        }
    }

    /// Parks the calling task at a yield point until the strategy releases
    /// it.
    ///
    /// The returned guard spans the task's next operation; dropping it
    /// signals that the operation finished so the next release may proceed.
    /// The signal is restored on panic unwind as well, so a failing
    /// assertion inside the block does not wedge the remaining tasks.
    pub fn shuffle(&self, task_id: T) -> ShuffleGuard<'_, T, S> {
        let mut pool = self.pool.lock().unwrap();
        pool.join(&task_id);
        self.pool_changed.notify_all();

        loop {
            pool = self.wait_for_quorum(pool, &task_id);

            if pool.is_released(&task_id) {
                break;
            }

            // Release phase, serialized on `op_finished`: the previously
            // released task must have left its shuffle block before the
            // next release happens.
            while !pool.try_consume_op_finished() {
                pool = self.op_finished.wait(pool).unwrap();
            }

            pool.release_one();
            self.pool_changed.notify_all();

            if pool.is_released(&task_id) {
                break;
            }
        }

        ShuffleGuard { shuffler: self }
    }

    /// Waits until the task is released or the pool has quorum, bounded by
    /// `max_wait_for`. A timeout is not an error: the release phase then
    /// decides from whatever tasks are pending.
    fn wait_for_quorum<'a>(
        &'a self,
        mut pool: MutexGuard<'a, Pool<T, S>>,
        task_id: &T,
    ) -> MutexGuard<'a, Pool<T, S>> {
        let deadline = Instant::now() + self.max_wait_for;

        while !pool.can_decide(task_id) {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if timeout.is_zero() {
                break;
            }

            let (guard, _) = self.pool_changed.wait_timeout(pool, timeout).unwrap();
            pool = guard;
        }

        pool
    }

    /// Marks one task as finished for the remainder of the pass.
    ///
    /// Shrinking the pool can complete the quorum for the tasks still
    /// waiting, so they are pulsed.
    pub fn decrement_pool_size(&self) {
        let mut pool = self.pool.lock().unwrap();
        pool.decrement();
        self.pool_changed.notify_all();
    }

    /// Closes the pass: re-arms the pool and returns the order in which the
    /// strategy released tasks.
    pub fn finish_sequence(&self) -> Vec<T> {
        self.pool.lock().unwrap().finish_sequence(self.pool_size)
    }

    /// True once the strategy's exploration budget is exhausted.
    pub fn strategy_completed(&self) -> bool {
        self.pool.lock().unwrap().is_completed()
    }

    /// Returns the shuffler and its strategy to a pristine state.
    pub fn reset(&self) {
        self.pool.lock().unwrap().reset(self.pool_size);
        self.op_finished.notify_all();
    }
}

impl<T, S> fmt::Debug for ThreadShuffler<T, S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ThreadShuffler")
            .field("pool_size", &self.pool_size)
            .field("max_wait_for", &self.max_wait_for)
            .finish()
    }
}

/// Scoped release for a [`ThreadShuffler`]: spans one operation between
/// yield points.
pub struct ShuffleGuard<'a, T: TaskId, S: Strategy<T>> {
    shuffler: &'a ThreadShuffler<T, S>,
}

impl<T: TaskId, S: Strategy<T>> Drop for ShuffleGuard<'_, T, S> {
    fn drop(&mut self) {
        // A poisoned pool means a sibling already hit a fatal contract
        // violation; there is nothing left to hand the release to.
        if let Ok(mut pool) = self.shuffler.pool.lock() {
            pool.set_op_finished();
            self.shuffler.op_finished.notify_all();
        }
    }
}

impl<T: TaskId, S: Strategy<T>> fmt::Debug for ShuffleGuard<'_, T, S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ShuffleGuard").finish()
    }
}
