use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertBuffer, AlertStamper};
use crate::models::{stats::compliance_rate, Alert, AlertKind, Detection, Stats};

/// Immutable point-in-time copy handed to readers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub detections: Vec<Detection>,
    /// Newest first.
    pub alerts: Vec<Alert>,
    pub stats: Stats,
}

#[derive(Debug, Default)]
pub struct AggregationState {
    detections: Vec<Detection>,
    stats: Stats,
    /// All-time masked count; `stats.compliance_rate` is derived from it.
    masked_total: u64,
    alerts: AlertBuffer,
    stamper: AlertStamper,
    current_day: Option<NaiveDate>,
}

pub fn no_mask_message(unmasked: usize) -> String {
    if unmasked == 1 {
        "Person detected without face mask".to_string()
    } else {
        format!("{unmasked} people detected without face masks")
    }
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current batch and fold it into the running totals.
    ///
    /// Returns the single `no_mask` alert raised for this batch, if any.
    pub fn update_detections(
        &mut self,
        batch: Vec<Detection>,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let batch_len = batch.len() as u64;
        let masked = batch.iter().filter(|d| d.is_compliant()).count() as u64;
        let unmasked = (batch_len - masked) as usize;

        self.detections = batch;
        self.stats.total_detections = self.stats.total_detections.saturating_add(batch_len);
        self.masked_total = self.masked_total.saturating_add(masked);
        self.stats.compliance_rate =
            compliance_rate(self.masked_total, self.stats.total_detections);

        if unmasked == 0 {
            return None;
        }
        Some(self.raise_alert(AlertKind::NoMask, no_mask_message(unmasked), now))
    }

    /// Record an alert. Identical messages are kept as separate entries.
    pub fn raise_alert(
        &mut self,
        kind: AlertKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Alert {
        let (id, timestamp) = self.stamper.stamp(now);
        let alert = Alert {
            id,
            kind,
            message: message.into(),
            timestamp,
        };

        self.alerts.insert(alert.clone());
        if kind == AlertKind::NoMask {
            self.stats.alerts_today = self.stats.alerts_today.saturating_add(1);
        }
        alert
    }

    pub fn dismiss_alert(&mut self, id: &str) -> bool {
        self.alerts.remove_by_id(id)
    }

    pub fn clear_alerts(&mut self) -> usize {
        self.alerts.clear()
    }

    pub fn set_uptime(&mut self, secs: u64) {
        self.stats.uptime = secs;
    }

    /// Reset `alerts_today` when the local calendar day changes.
    /// The first call only records the starting day.
    pub fn roll_day(&mut self, today: NaiveDate) -> bool {
        match self.current_day {
            Some(day) if day != today => {
                self.current_day = Some(today);
                self.stats.alerts_today = 0;
                true
            }
            Some(_) => false,
            None => {
                self.current_day = Some(today);
                false
            }
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn alerts(&self) -> &AlertBuffer {
        &self.alerts
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            detections: self.detections.clone(),
            alerts: self.alerts.to_vec(),
            stats: self.stats,
        }
    }
}
