use admission_queue::{AdmissionQueue, QueueOptions};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::info;

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::INFO)
    .with_target(false)
    .init();

  info!("--- Throughput Window Demo (3 completions per 500ms) ---");

  let queue = AdmissionQueue::<u32, String>::new(
    "throughput_queue",
    QueueOptions::new()
      .max_concurrent(2)
      .window(Duration::from_millis(500))
      .max_throughput_per_window(3),
    Handle::current(),
  );

  let started = Instant::now();
  let handles: Vec<_> = (0..9u32)
    .map(|i| {
      queue.submit(move || async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(i)
      })
    })
    .collect();

  for handle in handles {
    let task_id = handle.id();
    match handle.await_result().await {
      Ok(value) => info!(
        "Task {} returned {} at +{}ms (completions in window: {})",
        task_id,
        value,
        started.elapsed().as_millis(),
        queue.completions_in_window()
      ),
      Err(e) => info!("Task {} failed: {}", task_id, e),
    }
  }

  info!("--- Throughput Window Demo End ---");
}
