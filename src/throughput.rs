use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Completion timestamps within the trailing window.
///
/// Timestamps are recorded in non-decreasing order, so pruning only ever pops from the
/// front. `count()` is exact only right after a `prune` with the current time.
#[derive(Debug, Default)]
pub(crate) struct ThroughputLog {
  completions: VecDeque<Instant>,
}

impl ThroughputLog {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn record_completion(&mut self, now: Instant) {
    self.completions.push_back(now);
  }

  /// Drops every timestamp older than `now - window`.
  pub(crate) fn prune(&mut self, now: Instant, window: Duration) {
    while let Some(oldest) = self.completions.front() {
      if now.saturating_duration_since(*oldest) > window {
        self.completions.pop_front();
      } else {
        break;
      }
    }
  }

  pub(crate) fn count(&self) -> usize {
    self.completions.len()
  }

  /// The earliest instant at which the oldest recorded completion is pruned.
  ///
  /// `None` when the log is empty, or when that instant is past what `Instant` can
  /// represent (the entry never expires).
  pub(crate) fn next_expiry(&self, window: Duration) -> Option<Instant> {
    // Pruning is strict, so the entry is still counted at exactly `oldest + window`.
    let oldest = self.completions.front()?;
    oldest
      .checked_add(window)?
      .checked_add(Duration::from_millis(1))
  }
}
