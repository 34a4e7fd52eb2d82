use crate::error::TaskError;

use std::future::Future;
use std::pin::Pin;

use tokio::sync::oneshot;

/// Identifier assigned by the queue on submission.
pub type TaskId = u64;

/// The future a task supplier produces once the task is admitted.
pub type TaskFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

/// A deferred task body. It is invoked exactly once, at admission time.
pub(crate) type TaskSupplier<T, E> = Box<dyn FnOnce() -> TaskFuture<T, E> + Send + 'static>;

/// One-shot resolution function for a task's outcome handle.
pub(crate) type Resolver<T, E> = oneshot::Sender<Result<T, TaskError<E>>>;

/// A submitted task that has not been admitted yet.
pub(crate) struct PendingTask<T, E> {
  pub(crate) task_id: TaskId,
  pub(crate) supplier: TaskSupplier<T, E>,
}

impl<T, E> PendingTask<T, E> {
  pub(crate) fn new<F, Fut>(task_id: TaskId, supplier: F) -> Self
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    Self {
      task_id,
      supplier: Box::new(move || -> TaskFuture<T, E> { Box::pin(supplier()) }),
    }
  }
}
