use admission_queue::{AdmissionQueue, QueueOptions, TaskError, TracingObserver};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

/// A fixed batch of sample jobs: (name, simulated work, whether it fails).
const SAMPLE_TASKS: &[(&str, u64, bool)] = &[
  ("fetch-users", 120, false),
  ("fetch-orders", 80, false),
  ("resize-avatar", 200, false),
  ("charge-card", 50, true),
  ("send-receipt", 30, false),
  ("rebuild-index", 150, false),
  ("notify-webhook", 10, true),
];

async fn run_sample(name: &'static str, work_ms: u64, fails: bool) -> Result<String, String> {
  tokio::time::sleep(Duration::from_millis(work_ms)).await;
  if fails {
    Err(format!("{} gave up after {}ms", name, work_ms))
  } else {
    Ok(format!("{} done in {}ms", name, work_ms))
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,admission_queue=debug")),
    )
    .with_target(false)
    .init();

  info!("--- Sample Tasks Demo ---");

  let queue: AdmissionQueue<String, String> = AdmissionQueue::with_observer(
    "sample_queue",
    QueueOptions::new()
      .max_concurrent(3)
      .window_millis(100)
      .max_throughput_per_window(4),
    Handle::current(),
    Arc::new(TracingObserver::named("sample_queue")),
  );
  info!("Queue config: {:?}", queue.config());

  let handles: Vec<_> = SAMPLE_TASKS
    .iter()
    .map(|&(name, work_ms, fails)| (name, queue.submit(move || run_sample(name, work_ms, fails))))
    .collect();

  info!(
    "Submitted {} tasks: queued={}, executing={}",
    handles.len(),
    queue.queued_count(),
    queue.executing_count()
  );

  for (name, handle) in handles {
    match handle.await_result().await {
      Ok(message) => info!("[{}] {}", name, message),
      Err(TaskError::Failed(reason)) => info!("[{}] failed: {}", name, reason),
      Err(other) => info!("[{}] did not settle normally: {}", name, other),
    }
  }

  queue.wait_idle().await;
  info!("Final stats: {:?}", queue.stats());
  info!("--- Sample Tasks Demo End ---");
}
