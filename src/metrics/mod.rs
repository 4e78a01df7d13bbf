mod types;

pub use types::{TelemetrySnapshot, TickMetrics};

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::detector::DetectionSource;

const MAX_RECENT_TICKS: usize = 20;

pub struct TelemetryCollector {
    inner: Arc<Mutex<TelemetryState>>,
    snapshot_tx: Arc<watch::Sender<TelemetrySnapshot>>,
}

struct TelemetryState {
    recent_ticks: VecDeque<TickMetrics>,
    tick_count: u64,
    failure_count: u64,
    consecutive_failures: u32,
    fps: u32,
    source: DetectionSource,
}

impl TelemetryCollector {
    pub fn new(source: DetectionSource) -> Self {
        let (snapshot_tx, _) = watch::channel(TelemetrySnapshot {
            source,
            ..TelemetrySnapshot::default()
        });

        Self {
            inner: Arc::new(Mutex::new(TelemetryState {
                recent_ticks: VecDeque::with_capacity(MAX_RECENT_TICKS),
                tick_count: 0,
                failure_count: 0,
                consecutive_failures: 0,
                fps: 0,
                source,
            })),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn record_tick(&self, metrics: TickMetrics) {
        let mut state = self.inner.lock().await;

        state.tick_count += 1;
        state.consecutive_failures = 0;
        state.recent_ticks.push_back(metrics);
        if state.recent_ticks.len() > MAX_RECENT_TICKS {
            state.recent_ticks.pop_front();
        }

        self.publish(&state);
    }

    pub async fn record_failure(&self, consecutive: u32) {
        let mut state = self.inner.lock().await;
        state.tick_count += 1;
        state.failure_count += 1;
        state.consecutive_failures = consecutive;
        self.publish(&state);
    }

    pub async fn record_fps(&self, fps: u32) {
        let mut state = self.inner.lock().await;
        state.fps = fps;
        self.publish(&state);
    }

    pub async fn get_snapshot(&self) -> TelemetrySnapshot {
        let state = self.inner.lock().await;
        snapshot_of(&state)
    }

    fn publish(&self, state: &TelemetryState) {
        self.snapshot_tx.send_replace(snapshot_of(state));
    }
}

fn snapshot_of(state: &TelemetryState) -> TelemetrySnapshot {
    TelemetrySnapshot {
        fps: state.fps,
        last_processing_ms: state.recent_ticks.back().map(|t| t.processing_ms),
        source: state.source,
        recent_ticks: state.recent_ticks.iter().cloned().collect(),
        tick_count: state.tick_count,
        failure_count: state.failure_count,
        consecutive_failures: state.consecutive_failures,
    }
}

impl Clone for TelemetryCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            snapshot_tx: Arc::clone(&self.snapshot_tx),
        }
    }
}
