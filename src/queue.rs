use crate::config::{QueueConfig, QueueOptions};
use crate::error::{InternalError, TaskError};
use crate::handle::TaskHandle;
use crate::observer::{ObserverHub, QueueEvent, QueueObserver};
use crate::pending::PendingLedger;
use crate::registry::{InFlightRegistry, InFlightTask};
use crate::task::{PendingTask, Resolver, TaskFuture, TaskId};
use crate::throughput::ThroughputLog;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Point-in-time counters for a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
  pub submitted: u64,
  pub admitted: u64,
  pub succeeded: u64,
  pub failed: u64,
  pub queued: usize,
  pub executing: usize,
  pub peak_executing: usize,
}

/// Everything guarded by the queue lock. Each admission pass and each settlement
/// mutates this under a single acquisition.
struct QueueState<T, E> {
  pending: PendingLedger<T, E>,
  in_flight: InFlightRegistry,
  throughput: ThroughputLog,
  resolvers: HashMap<TaskId, Resolver<T, E>>,
  /// Admitted tasks whose suppliers have not been invoked yet, in admission order.
  starting: VecDeque<PendingTask<T, E>>,
  /// Set while one caller is invoking the suppliers in `starting`.
  draining: bool,
  wakeup_armed: bool,
  stats: QueueStats,
}

impl<T, E> QueueState<T, E> {
  fn is_idle(&self) -> bool {
    self.pending.is_empty() && self.in_flight.count() == 0
  }
}

struct QueueShared<T, E> {
  queue_name: Arc<String>,
  config: QueueConfig,
  state: Mutex<QueueState<T, E>>,
  observers: ObserverHub<T, E>,
  next_task_id: AtomicU64,
  idle: Notify,
  tokio_handle: TokioHandle,
}

/// Why an admission pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
  Drained,
  ConcurrencyCap,
  ThroughputCap,
  Internal,
}

/// A FIFO queue that admits tasks subject to a concurrency cap and a cap on
/// completions within a trailing time window.
///
/// Cloning is cheap and every clone drives the same queue. Tasks already submitted keep
/// running to settlement even after all clones are dropped.
pub struct AdmissionQueue<T, E> {
  shared: Arc<QueueShared<T, E>>,
}

impl<T, E> Clone for AdmissionQueue<T, E> {
  fn clone(&self) -> Self {
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl<T, E> fmt::Debug for AdmissionQueue<T, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.shared.state.lock();
    f.debug_struct("AdmissionQueue")
      .field("name", &self.shared.queue_name)
      .field("config", &self.shared.config)
      .field("pending", &state.pending)
      .field("executing", &state.in_flight.count())
      .field("completions_logged", &state.throughput.count())
      .field("observers", &self.shared.observers)
      .finish()
  }
}

impl<T: Send + 'static, E: Send + 'static> AdmissionQueue<T, E> {
  pub fn new(queue_name: &str, options: QueueOptions, tokio_handle: TokioHandle) -> Self {
    let queue_name = Arc::new(queue_name.to_string());
    Self::build(queue_name.clone(), options, tokio_handle, ObserverHub::detached(queue_name))
  }

  /// Like `new`, with `observer` notified of every lifecycle event.
  ///
  /// Outcomes are cloned for the observer, since the original goes to the task's handle
  /// before the observer runs.
  pub fn with_observer(
    queue_name: &str,
    options: QueueOptions,
    tokio_handle: TokioHandle,
    observer: Arc<dyn QueueObserver<T, E>>,
  ) -> Self
  where
    T: Clone,
    E: Clone,
  {
    let queue_name = Arc::new(queue_name.to_string());
    let observers = ObserverHub::attached(observer, queue_name.clone());
    Self::build(queue_name, options, tokio_handle, observers)
  }

  fn build(
    queue_name: Arc<String>,
    options: QueueOptions,
    tokio_handle: TokioHandle,
    observers: ObserverHub<T, E>,
  ) -> Self {
    let config = QueueConfig::from(options);
    info!(queue = %*queue_name, ?config, "Admission queue created.");

    Self {
      shared: Arc::new(QueueShared {
        observers,
        queue_name,
        config,
        state: Mutex::new(QueueState {
          pending: PendingLedger::new(),
          in_flight: InFlightRegistry::new(),
          throughput: ThroughputLog::new(),
          resolvers: HashMap::new(),
          starting: VecDeque::new(),
          draining: false,
          wakeup_armed: false,
          stats: QueueStats::default(),
        }),
        next_task_id: AtomicU64::new(0),
        idle: Notify::new(),
        tokio_handle,
      }),
    }
  }

  /// Enqueues a task and returns the handle its outcome will be delivered to.
  ///
  /// `supplier` is not called here. It runs once, when the task is admitted, and the
  /// future it returns decides the task's outcome.
  pub fn submit<F, Fut>(&self, supplier: F) -> TaskHandle<T, E>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let task_id = self.shared.next_task_id.fetch_add(1, AtomicOrdering::Relaxed);
    let (result_tx, result_rx) = oneshot::channel();

    {
      let mut state = self.shared.state.lock();
      state.resolvers.insert(task_id, result_tx);
      state.pending.append(PendingTask::new(task_id, supplier));
      state.stats.submitted += 1;
      debug!(queue = %*self.shared.queue_name, %task_id, queued = state.pending.size(), "Task submitted.");
    }

    self.shared.try_admit();

    TaskHandle {
      task_id,
      result_receiver: result_rx,
    }
  }

  pub fn name(&self) -> &str {
    &self.shared.queue_name
  }

  pub fn config(&self) -> QueueConfig {
    self.shared.config
  }

  /// Tasks submitted but not yet admitted.
  pub fn queued_count(&self) -> usize {
    self.shared.state.lock().pending.size()
  }

  /// Tasks admitted and not yet settled.
  pub fn executing_count(&self) -> usize {
    self.shared.state.lock().in_flight.count()
  }

  /// Completions counted within the trailing window as of now.
  pub fn completions_in_window(&self) -> usize {
    let mut state = self.shared.state.lock();
    state.throughput.prune(Instant::now(), self.shared.config.window);
    state.throughput.count()
  }

  pub fn stats(&self) -> QueueStats {
    let state = self.shared.state.lock();
    QueueStats {
      queued: state.pending.size(),
      executing: state.in_flight.count(),
      ..state.stats
    }
  }

  /// Turns observer notifications on or off. Enabled by default.
  pub fn set_notifications_enabled(&self, enabled: bool) {
    self.shared.observers.set_enabled(enabled);
  }

  /// Resolves once no task is queued or executing.
  pub async fn wait_idle(&self) {
    loop {
      let notified = self.shared.idle.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();

      if self.shared.state.lock().is_idle() {
        return;
      }
      notified.await;
    }
  }
}

impl<T: Send + 'static, E: Send + 'static> QueueShared<T, E> {
  /// The admission loop. Safe to call at any time; a no-op when nothing can be admitted.
  fn try_admit(self: &Arc<Self>) {
    let mut admitted = 0usize;
    let mut events: Vec<QueueEvent> = Vec::new();

    let halt = {
      let mut state = self.state.lock();
      let now = Instant::now();
      state.throughput.prune(now, self.config.window);

      let halt = loop {
        if state.in_flight.count() >= self.config.max_concurrent {
          break Halt::ConcurrencyCap;
        }
        if state.throughput.count() >= self.config.max_throughput_per_window {
          break Halt::ThroughputCap;
        }
        let Some(task) = state.pending.take_head() else {
          break Halt::Drained;
        };
        if let Err(e) = state.in_flight.register(task.task_id, InFlightTask { admitted_at: now }) {
          state.pending.restore_head(task);
          events.push(QueueEvent::Internal(e));
          break Halt::Internal;
        }
        let executing = state.in_flight.count();
        state.stats.admitted += 1;
        state.stats.peak_executing = state.stats.peak_executing.max(executing);
        events.push(QueueEvent::Admitted(task.task_id));
        state.starting.push_back(task);
        admitted += 1;
      };

      if halt == Halt::ThroughputCap && !state.pending.is_empty() && !state.wakeup_armed {
        if let Some(deadline) = state.throughput.next_expiry(self.config.window) {
          state.wakeup_armed = true;
          self.arm_wakeup(deadline);
        }
      }
      halt
    };

    trace!(queue = %*self.queue_name, admitted, ?halt, "Admission pass finished.");

    for event in events {
      self.observers.emit(event);
    }
    self.start_admitted();
  }

  /// Invokes suppliers of admitted tasks in admission order.
  ///
  /// Only one caller drains at a time. A pass triggered from inside a supplier (a nested
  /// `submit`) only appends to `starting`, and the caller already draining starts it after
  /// the tasks admitted before it.
  fn start_admitted(self: &Arc<Self>) {
    {
      let mut state = self.state.lock();
      if state.draining {
        return;
      }
      state.draining = true;
    }

    loop {
      let next = {
        let mut state = self.state.lock();
        let next = state.starting.pop_front();
        if next.is_none() {
          state.draining = false;
        }
        next
      };
      match next {
        Some(task) => self.start(task),
        None => break,
      }
    }
  }

  /// Re-runs admission once the oldest logged completion has left the window.
  fn arm_wakeup(self: &Arc<Self>, deadline: Instant) {
    debug!(queue = %*self.queue_name, "Throughput cap reached with tasks pending; arming wake-up.");
    let shared = self.clone();
    self.tokio_handle.spawn(async move {
      tokio::time::sleep_until(deadline).await;
      shared.state.lock().wakeup_armed = false;
      shared.try_admit();
    });
  }

  /// Invokes the task's supplier and spawns its settlement continuation.
  fn start(self: &Arc<Self>, task: PendingTask<T, E>) {
    let task_id = task.task_id;
    let supplier = task.supplier;

    let run: BoxFuture<'static, Result<T, TaskError<E>>> = match catch_unwind(AssertUnwindSafe(supplier)) {
      Ok(task_future) => Self::guard(task_future),
      Err(_) => {
        warn!(queue = %*self.queue_name, %task_id, "Task supplier panicked before producing a future.");
        future::ready(Err(TaskError::Panicked)).boxed()
      }
    };

    let shared = self.clone();
    self.tokio_handle.spawn(
      async move {
        let outcome = run.await;
        shared.settle(task_id, outcome);
      }
      .instrument(info_span!("admitted_task", queue = %*self.queue_name, %task_id)),
    );
  }

  fn guard(task_future: TaskFuture<T, E>) -> BoxFuture<'static, Result<T, TaskError<E>>> {
    AssertUnwindSafe(task_future)
      .catch_unwind()
      .map(|caught| match caught {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TaskError::Failed(e)),
        Err(_panic_payload) => Err(TaskError::Panicked),
      })
      .boxed()
  }

  /// Settlement: resolve the caller's handle, release the task and record the completion
  /// under one lock acquisition. Observers and the next admission pass run afterwards.
  fn settle(self: &Arc<Self>, task_id: TaskId, outcome: Result<T, TaskError<E>>) {
    let mut events: Vec<QueueEvent> = Vec::new();
    let succeeded = outcome.is_ok();
    let observed = self.observers.capture_outcome(&outcome);

    let now_idle = {
      let mut state = self.state.lock();

      match state.resolvers.remove(&task_id) {
        Some(tx) => {
          if tx.send(outcome).is_err() {
            trace!(queue = %*self.queue_name, %task_id, "Task handle was dropped; outcome discarded.");
          }
        }
        None => events.push(QueueEvent::Internal(InternalError::MissingResolver(task_id))),
      }

      match state.in_flight.release(task_id) {
        Ok(entry) => {
          trace!(queue = %*self.queue_name, %task_id, elapsed = ?entry.admitted_at.elapsed(), "Task released.");
        }
        Err(e) => events.push(QueueEvent::Internal(e)),
      }
      state.throughput.record_completion(Instant::now());

      if succeeded {
        state.stats.succeeded += 1;
      } else {
        state.stats.failed += 1;
      }
      state.is_idle()
    };

    if let Some(outcome) = observed {
      self.observers.emit_outcome(task_id, &outcome);
    }
    for event in events {
      self.observers.emit(event);
    }

    if now_idle {
      self.idle.notify_waiters();
    }
    self.try_admit();
  }
}
