use crate::error::{InternalError, TaskError};
use crate::task::TaskId;

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

/// Sink for queue lifecycle events.
///
/// This is the only place the queue reports what it does. Every method defaults to a
/// no-op, so implementors pick the events they care about. Calls are made without any
/// queue lock held, so an observer may query the queue it is attached to.
///
/// `task_succeeded` and `task_failed` run after the task's handle has been resolved and
/// the task has left the executing count, and before the next admission pass.
///
/// ```no_run
/// use admission_queue::{QueueObserver, TaskId};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct AdmissionCounter(AtomicUsize);
///
/// impl<T, E> QueueObserver<T, E> for AdmissionCounter {
///   fn task_admitted(&self, _task_id: TaskId) {
///     self.0.fetch_add(1, Ordering::Relaxed);
///   }
/// }
/// ```
pub trait QueueObserver<T, E>: Send + Sync {
  fn task_admitted(&self, _task_id: TaskId) {}

  fn task_succeeded(&self, _task_id: TaskId, _value: &T) {}

  fn task_failed(&self, _task_id: TaskId, _error: &TaskError<E>) {}

  fn internal_error(&self, _error: &InternalError) {}
}

/// Writes every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
  queue_name: Option<Arc<String>>,
}

impl TracingObserver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn named(queue_name: &str) -> Self {
    Self {
      queue_name: Some(Arc::new(queue_name.to_string())),
    }
  }

  fn name(&self) -> &str {
    self.queue_name.as_deref().map_or("-", String::as_str)
  }
}

impl<T, E: fmt::Debug> QueueObserver<T, E> for TracingObserver {
  fn task_admitted(&self, task_id: TaskId) {
    info!(queue = %self.name(), %task_id, "Task admitted.");
  }

  fn task_succeeded(&self, task_id: TaskId, _value: &T) {
    info!(queue = %self.name(), %task_id, "Task succeeded.");
  }

  fn task_failed(&self, task_id: TaskId, error: &TaskError<E>) {
    warn!(queue = %self.name(), %task_id, ?error, "Task failed.");
  }

  fn internal_error(&self, error: &InternalError) {
    error!(queue = %self.name(), %error, "Internal queue error.");
  }
}

/// An event collected under the queue lock, delivered after it is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueEvent {
  Admitted(TaskId),
  Internal(InternalError),
}

type Outcome<T, E> = Result<T, TaskError<E>>;

struct Attached<T, E> {
  observer: Arc<dyn QueueObserver<T, E>>,
  copy_outcome: fn(&Outcome<T, E>) -> Outcome<T, E>,
}

/// Per-queue dispatcher in front of the user's observer.
///
/// Holds the suppression switch and shields the queue from panicking observers.
pub(crate) struct ObserverHub<T, E> {
  attached: Option<Attached<T, E>>,
  enabled: AtomicBool,
  queue_name: Arc<String>,
}

impl<T, E> fmt::Debug for ObserverHub<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObserverHub")
      .field("has_observer", &self.attached.is_some())
      .field("enabled", &self.enabled.load(Ordering::Relaxed))
      .field("queue_name", &self.queue_name)
      .finish()
  }
}

impl<T: Clone, E: Clone> ObserverHub<T, E> {
  pub(crate) fn attached(observer: Arc<dyn QueueObserver<T, E>>, queue_name: Arc<String>) -> Self {
    Self {
      attached: Some(Attached {
        observer,
        copy_outcome: |outcome| outcome.clone(),
      }),
      enabled: AtomicBool::new(true),
      queue_name,
    }
  }
}

impl<T, E> ObserverHub<T, E> {
  pub(crate) fn detached(queue_name: Arc<String>) -> Self {
    Self {
      attached: None,
      enabled: AtomicBool::new(true),
      queue_name,
    }
  }

  pub(crate) fn set_enabled(&self, enabled: bool) {
    self.enabled.store(enabled, Ordering::Relaxed);
  }

  pub(crate) fn is_enabled(&self) -> bool {
    self.enabled.load(Ordering::Relaxed)
  }

  pub(crate) fn emit(&self, event: QueueEvent) {
    match event {
      QueueEvent::Admitted(task_id) => self.dispatch("task_admitted", |o| o.task_admitted(task_id)),
      QueueEvent::Internal(error) => {
        // Internal errors are always logged, even with notifications suppressed.
        warn!(queue = %*self.queue_name, %error, "Queue bookkeeping error.");
        self.dispatch("internal_error", |o| o.internal_error(&error));
      }
    }
  }

  /// Copies an outcome for later delivery with `emit_outcome`, so the original can be
  /// handed to the task's handle first. `None` when nobody would see it.
  pub(crate) fn capture_outcome(&self, outcome: &Outcome<T, E>) -> Option<Outcome<T, E>> {
    if !self.is_enabled() {
      return None;
    }
    self.attached.as_ref().map(|a| (a.copy_outcome)(outcome))
  }

  pub(crate) fn emit_outcome(&self, task_id: TaskId, outcome: &Outcome<T, E>) {
    match outcome {
      Ok(value) => self.dispatch("task_succeeded", |o| o.task_succeeded(task_id, value)),
      Err(error) => self.dispatch("task_failed", |o| o.task_failed(task_id, error)),
    }
  }

  fn dispatch(&self, hook: &'static str, call: impl FnOnce(&dyn QueueObserver<T, E>)) {
    if !self.is_enabled() {
      return;
    }
    let Some(attached) = self.attached.as_ref() else {
      return;
    };
    let observer = attached.observer.as_ref();
    if catch_unwind(AssertUnwindSafe(|| call(observer))).is_err() {
      error!(queue = %*self.queue_name, hook, "Queue observer panicked.");
    }
  }
}
