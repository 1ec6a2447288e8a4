//! Drive a shuffler through a full exploration.
//!
//! An exploration is a loop: while the strategy is not completed, run every
//! task to completion under the shuffler (one *pass*), then collect the
//! pass's sequence. The helpers here run that loop, log pass boundaries, and
//! apply the optional safety valves.

use std::env;
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::shuffle::{AsyncShuffler, ThreadShuffler};
use crate::strategy::{Strategy, TaskId};

/// Configure an exploration.
#[derive(Debug)]
#[non_exhaustive]
pub struct Builder {
    /// Maximum number of passes to run before giving up on completion.
    ///
    /// Defaults to the `SHUFFLE_MAX_PASSES` environment variable.
    pub max_passes: Option<usize>,

    /// Maximum amount of time to spend exploring.
    ///
    /// Defaults to the `SHUFFLE_MAX_DURATION` environment variable, in
    /// seconds.
    pub max_duration: Option<Duration>,
}

impl Builder {
    /// Create a new `Builder` instance with default values.
    pub fn new() -> Builder {
        let max_passes = env::var("SHUFFLE_MAX_PASSES")
            .map(|v| v.parse().expect("invalid value for `SHUFFLE_MAX_PASSES`"))
            .ok();

        let max_duration = env::var("SHUFFLE_MAX_DURATION")
            .map(|v| {
                let secs = v.parse().expect("invalid value for `SHUFFLE_MAX_DURATION`");
                Duration::from_secs(secs)
            })
            .ok();

        Builder {
            max_passes,
            max_duration,
        }
    }

    /// Runs `pass` until the shuffler's strategy has explored every
    /// interleaving, collecting one sequence per pass.
    ///
    /// Each invocation of `pass` must run all tasks to completion under the
    /// shuffler.
    pub fn explore<T, S, F>(&self, shuffler: &ThreadShuffler<T, S>, mut pass: F) -> Vec<Vec<T>>
    where
        T: TaskId,
        S: Strategy<T>,
        F: FnMut(),
    {
        let mut sequences = Vec::new();
        let start = Instant::now();

        while !shuffler.strategy_completed() {
            info!("~~~~~~~~ PASS {} ~~~~~~~~", sequences.len() + 1);

            pass();
            sequences.push(shuffler.finish_sequence());

            if self.budget_exhausted(sequences.len(), start) {
                return sequences;
            }
        }

        info!("completed in {} passes", sequences.len());
        sequences
    }

    /// Async counterpart of [`Builder::explore`].
    pub async fn explore_async<T, S, F, Fut>(
        &self,
        shuffler: &AsyncShuffler<T, S>,
        mut pass: F,
    ) -> Vec<Vec<T>>
    where
        T: TaskId,
        S: Strategy<T>,
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut sequences = Vec::new();
        let start = Instant::now();

        while !shuffler.strategy_completed() {
            info!("~~~~~~~~ PASS {} ~~~~~~~~", sequences.len() + 1);

            pass().await;
            sequences.push(shuffler.finish_sequence());

            if self.budget_exhausted(sequences.len(), start) {
                return sequences;
            }
        }

        info!("completed in {} passes", sequences.len());
        sequences
    }

    fn budget_exhausted(&self, passes: usize, start: Instant) -> bool {
        if let Some(max_passes) = self.max_passes {
            if passes >= max_passes {
                info!("pass budget exhausted after {} passes", passes);
                return true;
            }
        }

        if let Some(max_duration) = self.max_duration {
            if start.elapsed() >= max_duration {
                info!("time budget exhausted after {} passes", passes);
                return true;
            }
        }

        false
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

/// Explores every interleaving with default settings.
///
/// Log output is controlled by the `SHUFFLE_LOG` environment variable, which
/// takes the usual env-filter directives.
pub fn explore<T, S, F>(shuffler: &ThreadShuffler<T, S>, pass: F) -> Vec<Vec<T>>
where
    T: TaskId,
    S: Strategy<T>,
    F: FnMut(),
{
    tracing::subscriber::with_default(subscriber(), || Builder::new().explore(shuffler, pass))
}

/// Async counterpart of [`explore`].
pub async fn explore_async<T, S, F, Fut>(shuffler: &AsyncShuffler<T, S>, pass: F) -> Vec<Vec<T>>
where
    T: TaskId,
    S: Strategy<T>,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let _default = tracing::subscriber::set_default(subscriber());
    Builder::new().explore_async(shuffler, pass).await
}

fn subscriber() -> impl tracing::Subscriber + Send + Sync {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_env("SHUFFLE_LOG"))
        .with_test_writer()
        .without_time()
        .finish()
}
