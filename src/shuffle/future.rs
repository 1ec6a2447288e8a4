use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::shuffle::{Pool, DEFAULT_MAX_WAIT_FOR};
use crate::strategy::{Strategy, TaskId};

/// Shuffler flavor for cooperative tasks on an async runtime.
///
/// The pool state sits under a regular mutex (critical sections are short
/// and never held across an await) while `pool_changed` and `op_finished`
/// are pulsed through [`Notify`]. Waiters register interest *before*
/// re-checking the predicate, so a pulse that lands between the check and
/// the await is never lost.
pub struct AsyncShuffler<T, S> {
    pool: Mutex<Pool<T, S>>,
    pool_changed: Notify,
    op_finished: Notify,
    pool_size: usize,
    max_wait_for: Duration,
}

impl<T: TaskId, S: Strategy<T>> AsyncShuffler<T, S> {
    /// Creates a shuffler for `pool_size` cooperating tasks.
    pub fn new(pool_size: usize, strategy: S) -> AsyncShuffler<T, S> {
        AsyncShuffler::with_max_wait_for(pool_size, strategy, DEFAULT_MAX_WAIT_FOR)
    }

    /// Creates a shuffler with a custom straggler timeout; see
    /// [`ThreadShuffler::with_max_wait_for`].
    ///
    /// [`ThreadShuffler::with_max_wait_for`]: crate::shuffle::ThreadShuffler::with_max_wait_for
    pub fn with_max_wait_for(
        pool_size: usize,
        strategy: S,
        max_wait_for: Duration,
    ) -> AsyncShuffler<T, S> {
        AsyncShuffler {
            pool: Mutex::new(Pool::new(pool_size, strategy)),
            pool_changed: Notify::new(),
            op_finished: Notify::new(),
            pool_size,
            max_wait_for,
        }
    }

    /// Parks the calling task at a yield point until the strategy releases
    /// it. Async counterpart of [`ThreadShuffler::shuffle`].
    ///
    /// [`ThreadShuffler::shuffle`]: crate::shuffle::ThreadShuffler::shuffle
    pub async fn shuffle(&self, task_id: T) -> AsyncShuffleGuard<'_, T, S> {
        self.pool.lock().unwrap().join(&task_id);
        self.pool_changed.notify_waiters();

        loop {
            self.wait_for_quorum(&task_id).await;

            if self.pool.lock().unwrap().is_released(&task_id) {
                break;
            }

            // Release phase, serialized on `op_finished`: the previously
            // released task must have left its shuffle block before the
            // next release happens.
            loop {
                let pulse = self.op_finished.notified();
                tokio::pin!(pulse);
                pulse.as_mut().enable();

                if self.pool.lock().unwrap().try_consume_op_finished() {
                    break;
                }

                pulse.await;
            }

            let released_self = {
                let mut pool = self.pool.lock().unwrap();
                pool.release_one();
                pool.is_released(&task_id)
            };
            self.pool_changed.notify_waiters();

            if released_self {
                break;
            }
        }

        AsyncShuffleGuard { shuffler: self }
    }

    /// Waits until the task is released or the pool has quorum, bounded by
    /// `max_wait_for`. A timeout is not an error: the release phase then
    /// decides from whatever tasks are pending.
    async fn wait_for_quorum(&self, task_id: &T) {
        let deadline = Instant::now() + self.max_wait_for;

        loop {
            let pulse = self.pool_changed.notified();
            tokio::pin!(pulse);
            pulse.as_mut().enable();

            if self.pool.lock().unwrap().can_decide(task_id) {
                return;
            }

            if time::timeout_at(deadline, pulse).await.is_err() {
                return;
            }
        }
    }

    /// Marks one task as finished for the remainder of the pass.
    ///
    /// Shrinking the pool can complete the quorum for the tasks still
    /// waiting, so they are pulsed.
    pub fn decrement_pool_size(&self) {
        self.pool.lock().unwrap().decrement();
        self.pool_changed.notify_waiters();
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
        self.op_finished.notify_waiters();
    }
}

impl<T, S> fmt::Debug for AsyncShuffler<T, S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("AsyncShuffler")
            .field("pool_size", &self.pool_size)
            .field("max_wait_for", &self.max_wait_for)
            .finish()
    }
}

/// Scoped release for an [`AsyncShuffler`]: spans one operation between
/// yield points.
pub struct AsyncShuffleGuard<'a, T: TaskId, S: Strategy<T>> {
    shuffler: &'a AsyncShuffler<T, S>,
}

impl<T: TaskId, S: Strategy<T>> Drop for AsyncShuffleGuard<'_, T, S> {
    fn drop(&mut self) {
        // A poisoned pool means a sibling already hit a fatal contract
        // violation; there is nothing left to hand the release to.
        if let Ok(mut pool) = self.shuffler.pool.lock() {
            pool.set_op_finished();
        }
        self.shuffler.op_finished.notify_waiters();
    }
}

impl<T: TaskId, S: Strategy<T>> fmt::Debug for AsyncShuffleGuard<'_, T, S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("AsyncShuffleGuard").finish()
    }
}
