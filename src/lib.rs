//! A Tokio-based admission queue for futures.
//!
//! Submitted tasks start in FIFO order, bounded by a cap on simultaneously executing
//! tasks and a cap on completions within a trailing time window. Each submission returns
//! a handle that settles with that task's own outcome.

mod config;
mod error;
mod handle;
mod observer;
mod pending;
mod queue;
mod registry;
mod task;
mod throughput;

pub use config::{
  QueueConfig, QueueOptions, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_THROUGHPUT_PER_WINDOW, DEFAULT_WINDOW,
};
pub use error::{InternalError, TaskError};
pub use handle::TaskHandle;
pub use observer::{QueueObserver, TracingObserver};
pub use queue::{AdmissionQueue, QueueStats};
pub use task::{TaskFuture, TaskId};
