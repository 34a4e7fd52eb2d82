use admission_queue::{AdmissionQueue, QueueOptions, TaskHandle};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

async fn long_task_fn(id: usize) -> Result<String, String> {
  info!("Task {} starting (concurrency demo - should take 1s)", id);
  tokio::time::sleep(Duration::from_secs(1)).await;
  let result = format!("Task {} finished", id);
  info!("{}", result);
  Ok(result)
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Concurrency Limit Demo (Limit: 2) ---");

  let concurrency_limit = 2;
  let queue = AdmissionQueue::<String, String>::new(
    "concurrency_queue",
    QueueOptions::new().max_concurrent(concurrency_limit),
    Handle::current(),
  );

  let num_tasks = 5;
  let mut handles: Vec<TaskHandle<String, String>> = Vec::new();

  info!(
    "Submitting {} tasks, each takes 1 sec. With concurrency {}, this should take ~{} secs.",
    num_tasks,
    concurrency_limit,
    (num_tasks as f32 / concurrency_limit as f32).ceil()
  );

  for i in 0..num_tasks {
    handles.push(queue.submit(move || long_task_fn(i)));
    info!(
      "Submitted task {}: queued={}, executing={}",
      i,
      queue.queued_count(),
      queue.executing_count()
    );
  }

  for handle in handles {
    let task_id = handle.id();
    match handle.await_result().await {
      Ok(result) => info!("Task {} main: Received result: {}", task_id, result),
      Err(e) => info!("Task {} main: Received error: {:?}", task_id, e),
    }
  }

  info!("All tasks processed. Stats: {:?}", queue.stats());
  info!("--- Concurrency Limit Demo End ---");
}
