use tokio::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_millis(1_000);

/// Reporting window for throughput: counts ticks and emits a rate each time
/// at least one second has passed, then starts over. Not a moving average.
#[derive(Debug, Clone)]
pub struct FpsWindow {
    ticks: u32,
    window_start: Instant,
}

impl FpsWindow {
    pub fn new(now: Instant) -> Self {
        Self {
            ticks: 0,
            window_start: now,
        }
    }

    pub fn record(&mut self, now: Instant) -> Option<u32> {
        self.ticks = self.ticks.saturating_add(1);

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < WINDOW {
            return None;
        }

        let elapsed_ms = elapsed.as_millis().max(1) as f64;
        let fps = (self.ticks as f64 * 1_000.0 / elapsed_ms).round() as u32;
        self.ticks = 0;
        self.window_start = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_window() {
        let start = Instant::now();
        let mut window = FpsWindow::new(start);

        let mut reports = Vec::new();
        for i in 1..=25 {
            if let Some(fps) = window.record(start + Duration::from_millis(i * 100)) {
                reports.push(fps);
            }
        }
        // Ticks at 100ms spacing: windows close at 1000ms and 2000ms.
        assert_eq!(reports, vec![10, 10]);
    }

    #[test]
    fn rounds_over_actual_elapsed_time() {
        let start = Instant::now();
        let mut window = FpsWindow::new(start);
        for i in 1..=6 {
            assert_eq!(window.record(start + Duration::from_millis(i * 150)), None);
        }
        // 7 ticks over 1050ms -> 6.67 -> 7
        assert_eq!(window.record(start + Duration::from_millis(1_050)), Some(7));
    }
}
