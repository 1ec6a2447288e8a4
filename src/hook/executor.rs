use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::ops;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::{self, ArcWake};
use tracing::trace;

use crate::strategy::Strategy;

/// A deterministic executor whose poll order is a scheduling choice.
///
/// The executor keeps a FIFO queue of ready tasks. While the hook is
/// activated and more than one task is ready, the strategy picks which task
/// is polled next; a lone ready task is polled without consulting the
/// strategy, so only contested choices enter the exploration. TaskIDs are
/// the indices of the futures handed to [`run_pass`].
///
/// [`run_pass`]: ExecutorHook::run_pass
pub struct ExecutorHook<S> {
    strategy: S,
    enabled: bool,
}

impl<S: Strategy<usize>> ExecutorHook<S> {
    /// Creates a hook around `strategy`.
    pub fn new(strategy: S) -> ExecutorHook<S> {
        ExecutorHook {
            strategy,
            enabled: false,
        }
    }

    /// Enables the hook for the duration of the returned guard.
    pub fn activate(&mut self) -> Activation<'_, S> {
        self.enabled = true;
        trace!("executor hook enabled");
        Activation { hook: self }
    }

    /// Runs one pass: polls every task to completion, consulting the
    /// strategy whenever the poll order is contested.
    ///
    /// # Panics
    ///
    /// Panics if the tasks deadlock: some are still pending while none is
    /// ready to poll.
    pub fn run_pass(&mut self, tasks: Vec<LocalBoxFuture<'_, ()>>) {
        let mut tasks: Vec<Option<LocalBoxFuture<'_, ()>>> =
            tasks.into_iter().map(Some).collect();

        // Seed the queue in spawn order, like any executor would.
        let ready = Arc::new(Mutex::new(ReadyQueue {
            queue: (0..tasks.len()).collect(),
            queued: vec![true; tasks.len()],
        }));

        let mut remaining = tasks.len();
        while remaining > 0 {
            let index = self.next_index(&ready);

            let waker = task::waker(Arc::new(IndexWaker {
                index,
                ready: ready.clone(),
            }));
            let mut cx = Context::from_waker(&waker);

            let task = tasks[index]
                .as_mut()
                .expect("[shuffler internal bug] woke a finished task");
            if task.as_mut().poll(&mut cx).is_ready() {
                tasks[index] = None;
                remaining -= 1;
            }
        }
    }

    fn next_index(&mut self, ready: &Arc<Mutex<ReadyQueue>>) -> usize {
        let mut ready = ready.lock().unwrap();

        assert!(
            !ready.queue.is_empty(),
            "deadlock: every remaining task is pending and none holds a wake",
        );

        let index = if self.enabled && ready.queue.len() > 1 {
            let options: BTreeSet<usize> = ready.queue.iter().copied().collect();
            let chosen = self.strategy.choose_next(&options);
            let position = ready
                .queue
                .iter()
                .position(|&index| index == chosen)
                .expect("[shuffler internal bug] chose a task that is not ready");
            ready.queue.remove(position).unwrap()
        } else {
            ready.queue.pop_front().unwrap()
        };

        ready.queued[index] = false;
        index
    }

    /// True once the strategy's exploration budget is exhausted.
    pub fn strategy_completed(&self) -> bool {
        self.strategy.is_completed()
    }

    /// Closes the pass and returns the contested poll choices in order.
    pub fn finish_sequence(&mut self) -> Vec<usize> {
        self.strategy.finish_sequence()
    }

    /// Returns the strategy to a pristine state.
    pub fn reset(&mut self) {
        self.strategy.reset();
    }
}

impl<S> fmt::Debug for ExecutorHook<S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ExecutorHook")
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Scoped activation of an [`ExecutorHook`]; disables the hook when dropped.
pub struct Activation<'a, S> {
    hook: &'a mut ExecutorHook<S>,
}

impl<S> ops::Deref for Activation<'_, S> {
    type Target = ExecutorHook<S>;

    fn deref(&self) -> &ExecutorHook<S> {
        self.hook
    }
}

impl<S> ops::DerefMut for Activation<'_, S> {
    fn deref_mut(&mut self) -> &mut ExecutorHook<S> {
        self.hook
    }
}

impl<S> Drop for Activation<'_, S> {
    fn drop(&mut self) {
        self.hook.enabled = false;
        trace!("executor hook disabled");
    }
}

impl<S> fmt::Debug for Activation<'_, S> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Activation").finish()
    }
}

struct ReadyQueue {
    queue: VecDeque<usize>,
    /// Guards against double-enqueue when a task is woken more than once
    /// before it is polled.
    queued: Vec<bool>,
}

struct IndexWaker {
    index: usize,
    ready: Arc<Mutex<ReadyQueue>>,
}

impl ArcWake for IndexWaker {
    fn wake_by_ref(arc_self: &Arc<IndexWaker>) {
        let mut ready = arc_self.ready.lock().unwrap();
        if !ready.queued[arc_self.index] {
            ready.queued[arc_self.index] = true;
            ready.queue.push_back(arc_self.index);
        }
    }
}

/// Cooperative yield point: wakes itself and returns `Pending` exactly once,
/// handing the executor a scheduling choice.
pub async fn yield_now() {
    struct YieldNow {
        yielded: bool,
    }

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.yielded {
                return Poll::Ready(());
            }

            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    YieldNow { yielded: false }.await
}
