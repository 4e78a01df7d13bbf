use tokio::time::{Duration, Instant};

/// Escalates runs of detector failures into a `system` alert.
///
/// An alert is due once `threshold` consecutive failures have accumulated, and
/// at most once per `cooldown`. A success resets the run but not the cooldown.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    threshold: u32,
    cooldown: Duration,
    consecutive: u32,
    last_alert: Option<Instant>,
}

impl FailureTracker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            consecutive: 0,
            last_alert: None,
        }
    }

    /// Returns true when the caller should raise a system alert now.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        if self.consecutive < self.threshold {
            return false;
        }

        let cooled_down = self
            .last_alert
            .map(|at| now.saturating_duration_since(at) >= self.cooldown)
            .unwrap_or(true);
        if cooled_down {
            self.last_alert = Some(now);
        }
        cooled_down
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}
