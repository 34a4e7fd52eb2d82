use std::time::Duration;

use tracing::warn;

pub const DEFAULT_MAX_CONCURRENT: usize = 1;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_THROUGHPUT_PER_WINDOW: usize = 1000;

/// Caller-supplied queue options. Any option left unset keeps its default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueOptions {
  pub max_concurrent: Option<usize>,
  pub window: Option<Duration>,
  pub max_throughput_per_window: Option<usize>,
}

impl QueueOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Hard cap on simultaneously executing tasks. `0` is raised to 1.
  pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
    self.max_concurrent = Some(max_concurrent);
    self
  }

  /// Width of the trailing throughput window.
  pub fn window(mut self, window: Duration) -> Self {
    self.window = Some(window);
    self
  }

  pub fn window_millis(self, millis: u64) -> Self {
    self.window(Duration::from_millis(millis))
  }

  /// Maximum completions allowed within any trailing window. `0` is raised to 1.
  pub fn max_throughput_per_window(mut self, max: usize) -> Self {
    self.max_throughput_per_window = Some(max);
    self
  }
}

/// Resolved queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
  pub max_concurrent: usize,
  pub window: Duration,
  pub max_throughput_per_window: usize,
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self {
      max_concurrent: DEFAULT_MAX_CONCURRENT,
      window: DEFAULT_WINDOW,
      max_throughput_per_window: DEFAULT_MAX_THROUGHPUT_PER_WINDOW,
    }
  }
}

impl From<QueueOptions> for QueueConfig {
  fn from(options: QueueOptions) -> Self {
    let defaults = QueueConfig::default();

    let max_concurrent = options.max_concurrent.unwrap_or(defaults.max_concurrent);
    let max_throughput_per_window = options
      .max_throughput_per_window
      .unwrap_or(defaults.max_throughput_per_window);

    // A zero cap would leave every submission queued forever.
    if max_concurrent == 0 {
      warn!("max_concurrent of 0 would never admit a task; using 1.");
    }
    if max_throughput_per_window == 0 {
      warn!("max_throughput_per_window of 0 would never admit a task; using 1.");
    }

    Self {
      max_concurrent: max_concurrent.max(1),
      window: options.window.unwrap_or(defaults.window),
      max_throughput_per_window: max_throughput_per_window.max(1),
    }
  }
}
