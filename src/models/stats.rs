use serde::{Deserialize, Serialize};

/// Process-wide cumulative statistics. Only the aggregation state writes these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_detections: u64,
    /// Integer percentage in `0..=100` of all-time detections that were masked.
    pub compliance_rate: u8,
    pub alerts_today: u64,
    pub uptime: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_detections: 0,
            compliance_rate: 100,
            alerts_today: 0,
            uptime: 0,
        }
    }
}

/// `round(100 * masked / total)`, or 100 when nothing has been seen yet.
pub fn compliance_rate(masked: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let masked = masked.min(total) as u128;
    let total = total as u128;
    // Half-up rounding in integer arithmetic.
    ((200 * masked + total) / (2 * total)) as u8
}
