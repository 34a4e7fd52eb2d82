use crate::task::PendingTask;

use std::collections::VecDeque;
use std::fmt;

/// Submitted tasks that have not been admitted yet, in submission order.
///
/// Strictly FIFO: admission always takes the head, nothing is reordered or skipped.
pub(crate) struct PendingLedger<T, E> {
  tasks: VecDeque<PendingTask<T, E>>,
}

impl<T, E> fmt::Debug for PendingLedger<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PendingLedger")
      .field("len", &self.tasks.len())
      .field("head", &self.tasks.front().map(|t| t.task_id))
      .finish()
  }
}

impl<T, E> PendingLedger<T, E> {
  pub(crate) fn new() -> Self {
    Self { tasks: VecDeque::new() }
  }

  pub(crate) fn append(&mut self, task: PendingTask<T, E>) {
    self.tasks.push_back(task);
  }

  /// Removes and returns the oldest pending task.
  pub(crate) fn take_head(&mut self) -> Option<PendingTask<T, E>> {
    self.tasks.pop_front()
  }

  /// Puts a task taken by `take_head` back in front, for when its admission was aborted.
  pub(crate) fn restore_head(&mut self, task: PendingTask<T, E>) {
    self.tasks.push_front(task);
  }

  pub(crate) fn size(&self) -> usize {
    self.tasks.len()
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  #[cfg(test)]
  pub(crate) fn ids(&self) -> Vec<crate::task::TaskId> {
    self.tasks.iter().map(|t| t.task_id).collect()
  }
}
