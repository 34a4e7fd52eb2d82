use crate::task::TaskId;

use thiserror::Error;

/// The failure a submitter can observe through its [`TaskHandle`](crate::TaskHandle).
///
/// Only the task's own outcome is ever surfaced here. Bookkeeping problems inside the
/// queue are reported as [`InternalError`] to the observer instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError<E> {
  #[error("Task failed: {0}")]
  Failed(E),

  #[error("Submitted task panicked")]
  Panicked,

  #[error("Task result channel closed before an outcome was delivered")]
  ResultChannelClosed,
}

impl<E> TaskError<E> {
  /// Returns the task's own error, if that is what this is.
  pub fn into_failure(self) -> Option<E> {
    match self {
      TaskError::Failed(e) => Some(e),
      _ => None,
    }
  }

  pub fn is_panic(&self) -> bool {
    matches!(self, TaskError::Panicked)
  }
}

/// Unexpected conditions in admission or settlement bookkeeping.
///
/// These never reach a submitter and never stop the queue; the affected step is
/// skipped and processing continues.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalError {
  #[error("No resolver registered for settled task {0}; outcome dropped")]
  MissingResolver(TaskId),

  #[error("Settled task {0} was not registered as in flight")]
  UnknownInFlight(TaskId),

  #[error("Task {0} is already registered as in flight")]
  DuplicateInFlight(TaskId),
}
