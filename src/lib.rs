#![deny(missing_debug_implementations, missing_docs, rust_2018_idioms)]

//! Shuffler is a tool for testing concurrent programs by driving them
//! through every distinct interleaving of their operations.
//!
//! # Background
//!
//! Testing concurrent code is challenging; cooperating tasks can interleave
//! in all sorts of ways, and each such interleaving might expose a bug. Some
//! orderings are so rare under natural scheduling that they won't surface
//! even if the test is run millions of times. A database transaction that
//! loses an update only when another transaction reads between its read and
//! its write is the classic case: the racy ordering almost never happens on
//! a lightly loaded test machine.
//!
//! Shuffler replaces hope with enumeration. User code marks its operations
//! with *yield points*; the shuffler parks every task at its yield point and
//! releases exactly one of them at a time, in an order picked by a strategy.
//! Run the same test once per ordering and every interleaving is observed,
//! not just the likely ones.
//!
//! # Usage
//!
//! Wrap each operation of each task in a [`shuffle`] block, mark task
//! completion with [`decrement_pool_size`], and drive passes until the
//! strategy has seen everything:
//!
//! ```no_run
//! use shuffler::{ExhaustiveStrategy, ThreadShuffler};
//! use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
//! use std::thread;
//!
//! let counter = AtomicUsize::new(0);
//! let shuffler = ThreadShuffler::new(2, ExhaustiveStrategy::new());
//!
//! shuffler::explore(&shuffler, || {
//!     thread::scope(|s| {
//!         for task_id in ["A", "B"] {
//!             let counter = &counter;
//!             let shuffler = &shuffler;
//!             s.spawn(move || {
//!                 // read
//!                 let value = {
//!                     let _op = shuffler.shuffle(task_id);
//!                     counter.load(SeqCst)
//!                 };
//!                 // write, deliberately not atomic with the read
//!                 {
//!                     let _op = shuffler.shuffle(task_id);
//!                     counter.store(value + 1, SeqCst);
//!                 }
//!                 shuffler.decrement_pool_size();
//!             });
//!         }
//!     });
//!
//!     // Fails on the four interleavings where the increments race.
//!     assert_eq!(2, counter.swap(0, SeqCst));
//! });
//! ```
//!
//! The six orderings of the four operations above are each run exactly once,
//! so the lost-update race is found deterministically.
//!
//! # Strategies
//!
//! [`ExhaustiveStrategy`] enumerates every distinct ordering exactly once by
//! walking a lazily built decision tree depth-first. It requires the
//! workload to be deterministic: the set of tasks pending at a given
//! decision point must be the same on every pass that reaches it.
//! [`RandomStrategy`] samples orderings from a seedable generator under a
//! fixed pass budget instead; useful when the exhaustive space is too large.
//!
//! # Flavors and adapters
//!
//! [`ThreadShuffler`] coordinates OS threads, [`AsyncShuffler`] cooperative
//! tasks; the [`hook`] module adapts suspension points that user code does
//! not control directly: the poll order of an async executor and the
//! statements sent to a database driver.
//!
//! # Stragglers
//!
//! A release normally waits until every live task is parked. A task doing
//! real work between yield points, such as a slow database call, may arrive
//! late, so the wait is bounded by `max_wait_for` (default 20 ms) and then
//! proceeds with whatever tasks are pending. This trades exhaustiveness for
//! liveness; raise the bound when operations are deliberately slow.
//!
//! # Logging
//!
//! The [`explore`](mod@explore) drivers emit pass boundaries and scheduling
//! events through `tracing`; set the `SHUFFLE_LOG` environment variable to
//! an env-filter directive (for example `SHUFFLE_LOG=shuffler=trace`) to see
//! them.
//!
//! [`shuffle`]: ThreadShuffler::shuffle
//! [`decrement_pool_size`]: ThreadShuffler::decrement_pool_size

pub mod explore;
pub mod hook;
pub mod interleave;
pub mod shuffle;
pub mod strategy;

#[doc(inline)]
pub use crate::explore::{explore, explore_async};
pub use crate::shuffle::{AsyncShuffler, ThreadShuffler};
pub use crate::strategy::{ExhaustiveStrategy, RandomStrategy, Strategy, TaskId};
