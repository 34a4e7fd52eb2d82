use crate::error::TaskError;
use crate::task::TaskId;

use tokio::sync::oneshot;
use tracing;

/// The caller's view of a submitted task.
///
/// Settles exactly once, with the value or error the task's own future produced.
#[derive(Debug)]
pub struct TaskHandle<T, E> {
  pub(crate) task_id: TaskId,
  pub(crate) result_receiver: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> TaskHandle<T, E> {
  /// Returns the id the queue assigned to this task.
  pub fn id(&self) -> TaskId {
    self.task_id
  }

  /// Waits for the task to be admitted, run and settled, and returns its outcome.
  ///
  /// # Errors
  /// Returns `TaskError::Failed` with the task's own error if its future failed.
  /// Returns `TaskError::Panicked` if the supplier or its future panicked.
  /// Returns `TaskError::ResultChannelClosed` if the task was dropped without settling,
  /// which only happens when the Tokio runtime shuts down underneath it.
  pub async fn await_result(self) -> Result<T, TaskError<E>> {
    match self.result_receiver.await {
      Ok(outcome) => outcome,
      Err(recv_error) => {
        tracing::warn!(task_id = %self.task_id, "Result channel receive error: {}", recv_error);
        Err(TaskError::ResultChannelClosed)
      }
    }
  }
}
