use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Notify;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::shuffle::DEFAULT_MAX_WAIT_FOR;
use crate::strategy::Strategy;

tokio::task_local! {
    static CURRENT_TASK: u32;
}

/// Returns the id of the operation driving the current task, if the task was
/// started by [`QueryHook::run_pass`].
pub fn current_task() -> Option<u32> {
    CURRENT_TASK.try_with(|task_id| *task_id).ok()
}

struct HookState<S> {
    pending: BTreeSet<u32>,
    cur_pool_size: usize,
    armed: bool,
    strategy: S,
}

/// Database-driver adapter: turns a before-statement callback into a
/// rendezvous.
///
/// The user's data layer calls [`before_statement`] right before handing a
/// statement to the driver. When the hook is armed and the calling task was
/// started by [`run_pass`], the statement becomes a yield point: the task
/// parks until the strategy releases it. TaskIDs are the 1-based positions
/// of the operations passed to [`run_pass`].
///
/// Unlike the core shufflers there is no release interlock here: a released
/// task executes its statement and re-arrives before the pool can refill, so
/// the pool quorum alone serializes the statement order.
///
/// [`before_statement`]: QueryHook::before_statement
/// [`run_pass`]: QueryHook::run_pass
pub struct QueryHook<S> {
    state: Mutex<HookState<S>>,
    pool_changed: Notify,
    max_wait_for: Duration,
}

impl<S: Strategy<u32>> QueryHook<S> {
    /// Creates a hook around `strategy`.
    pub fn new(strategy: S) -> QueryHook<S> {
        QueryHook::with_max_wait_for(strategy, DEFAULT_MAX_WAIT_FOR)
    }

    /// Creates a hook with a custom straggler timeout. The bound matters
    /// more here than in the core shufflers: statements run against a real
    /// database, so a task's next yield point can be a slow round-trip away.
    pub fn with_max_wait_for(strategy: S, max_wait_for: Duration) -> QueryHook<S> {
        QueryHook {
            state: Mutex::new(HookState {
                pending: BTreeSet::new(),
                cur_pool_size: 0,
                armed: false,
                strategy,
            }),
            pool_changed: Notify::new(),
            max_wait_for,
        }
    }

    /// Arms the hook for the duration of the returned guard.
    pub fn activate(&self) -> Activation<'_, S> {
        self.state.lock().unwrap().armed = true;
        debug!("statement hook armed");
        Activation { hook: self }
    }

    /// Yield point for the data layer: parks the current task if the hook is
    /// armed and a task identity is in scope, and returns immediately
    /// otherwise.
    pub async fn before_statement(&self) {
        let Some(task_id) = current_task() else { return };

        if !self.state.lock().unwrap().armed {
            return;
        }

        trace!(task = task_id, "statement yield point");
        self.rendezvous(task_id).await;
    }

    async fn rendezvous(&self, task_id: u32) {
        self.state.lock().unwrap().pending.insert(task_id);
        self.pool_changed.notify_waiters();

        loop {
            self.wait_for_quorum(task_id).await;

            if !self.state.lock().unwrap().pending.contains(&task_id) {
                break;
            }

            let released_self = {
                let mut state = self.state.lock().unwrap();
                let state = &mut *state;
                let released = state.strategy.choose_next(&state.pending);
                trace!(task = released, "released");
                state.pending.remove(&released);
                released == task_id
            };
            self.pool_changed.notify_waiters();

            if released_self {
                break;
            }
        }
    }

    async fn wait_for_quorum(&self, task_id: u32) {
        let deadline = Instant::now() + self.max_wait_for;

        loop {
            let pulse = self.pool_changed.notified();
            tokio::pin!(pulse);
            pulse.as_mut().enable();

            {
                let state = self.state.lock().unwrap();
                if !state.pending.contains(&task_id)
                    || state.pending.len() >= state.cur_pool_size
                {
                    return;
                }
            }

            if time::timeout_at(deadline, pulse).await.is_err() {
                return;
            }
        }
    }

    fn decrement_pool_size(&self) {
        {
            let mut state = self.state.lock().unwrap();
            assert!(
                state.cur_pool_size > 0,
                "pool size underflow: more operations finished than were started",
            );
            state.cur_pool_size -= 1;
        }
        self.pool_changed.notify_waiters();
    }

    /// True once the strategy's exploration budget is exhausted.
    pub fn strategy_completed(&self) -> bool {
        self.state.lock().unwrap().strategy.is_completed()
    }

    /// Closes the pass and returns the statement order the strategy chose.
    pub fn finish_sequence(&self) -> Vec<u32> {
        self.state.lock().unwrap().strategy.finish_sequence()
    }

    /// Returns the strategy to a pristine state.
    pub fn reset(&self) {
        self.state.lock().unwrap().strategy.reset();
    }

    /// Runs one pass: every operation becomes a task whose id is its 1-based
    /// position, and each finished operation shrinks the pool. Returns the
    /// pass's sequence.
    ///
    /// # Panics
    ///
    /// Panics if the exploration is already complete, the hook is not armed,
    /// or fewer than two operations are given.
    pub async fn run_pass<F, Fut>(&self, operations: &[F]) -> Vec<u32>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()>,
    {
        assert!(
            !self.strategy_completed(),
            "exploration is already complete",
        );
        assert!(operations.len() > 1, "at least two operations required");

        {
            let mut state = self.state.lock().unwrap();
            assert!(state.armed, "activate the hook before running a pass");
            state.cur_pool_size = operations.len();
        }

        join_all(operations.iter().enumerate().map(|(ix, operation)| {
            let task_id = ix as u32 + 1;
            CURRENT_TASK.scope(task_id, async move {
                operation().await;
                self.decrement_pool_size();
            })
        }))
        .await;

        self.finish_sequence()
    }
}

impl<S> fmt::Debug for QueryHook<S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("QueryHook")
            .field("max_wait_for", &self.max_wait_for)
            .finish()
    }
}

/// Scoped activation of a [`QueryHook`]; disarms the hook when dropped.
pub struct Activation<'a, S> {
    hook: &'a QueryHook<S>,
}

impl<S> Drop for Activation<'_, S> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.hook.state.lock() {
            state.armed = false;
        }
        debug!("statement hook disarmed");
    }
}

impl<S> fmt::Debug for Activation<'_, S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Activation").finish()
    }
}
