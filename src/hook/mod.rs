//! Adapters that surface external suspension points as scheduling choices.
//!
//! The core shuffler needs user code to call `shuffle` explicitly. The hooks
//! here cover the two cases where that is impractical: async code whose
//! suspension points are ordinary awaits ([`ExecutorHook`] decides which
//! ready task is polled next), and database code whose yield points are the
//! statements it sends to the driver ([`QueryHook`] turns a before-statement
//! callback into a rendezvous).

/// Turns ordinary `.await` suspension points into scheduling choices.
pub mod executor;
pub use self::executor::{yield_now, ExecutorHook};

/// Turns before-statement database callbacks into a rendezvous.
pub mod query;
pub use self::query::{current_task, QueryHook};
