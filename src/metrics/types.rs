use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detector::DetectionSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickMetrics {
    pub timestamp: DateTime<Utc>,
    pub processing_ms: f64,
    pub batch_size: usize,
    pub unmasked: usize,
    pub source: DetectionSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub fps: u32,
    pub last_processing_ms: Option<f64>,
    /// Labels every latency figure above; synthetic timings are not live measurements.
    pub source: DetectionSource,
    pub recent_ticks: Vec<TickMetrics>,
    pub tick_count: u64,
    pub failure_count: u64,
    pub consecutive_failures: u32,
}
