use crate::error::InternalError;
use crate::task::TaskId;

use std::collections::HashMap;

use tokio::time::Instant;

/// Bookkeeping for one admitted task.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InFlightTask {
  pub(crate) admitted_at: Instant,
}

/// Tasks currently admitted and running, keyed by id so an out-of-order settlement
/// releases only its own entry.
#[derive(Debug, Default)]
pub(crate) struct InFlightRegistry {
  running: HashMap<TaskId, InFlightTask>,
}

impl InFlightRegistry {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn register(&mut self, task_id: TaskId, task: InFlightTask) -> Result<(), InternalError> {
    if self.running.contains_key(&task_id) {
      return Err(InternalError::DuplicateInFlight(task_id));
    }
    self.running.insert(task_id, task);
    Ok(())
  }

  pub(crate) fn release(&mut self, task_id: TaskId) -> Result<InFlightTask, InternalError> {
    self
      .running
      .remove(&task_id)
      .ok_or(InternalError::UnknownInFlight(task_id))
  }

  pub(crate) fn count(&self) -> usize {
    self.running.len()
  }
}
