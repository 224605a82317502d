//! The background pipeline worker.
//!
//! Consumes queue jobs, binds a user context (a read-only snapshot of
//! the owner's secrets), runs the matching pipeline and keeps the job
//! document's progress current. Cancellation is cooperative: every
//! checkpoint re-reads the job document.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod pipelines;
pub mod progress;

pub use config::WorkerConfig;
pub use context::{UserContext, WorkerContext};
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use progress::JobTracker;
