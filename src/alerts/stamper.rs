use chrono::{DateTime, Utc};

/// Hands out alert ids and timestamps.
///
/// Timestamps never go backwards even if the wall clock does, and ids carry a
/// sequence number so two alerts in the same millisecond stay distinct.
#[derive(Debug, Default)]
pub struct AlertStamper {
    last: Option<DateTime<Utc>>,
    seq: u64,
}

impl AlertStamper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
        let timestamp = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(timestamp);
        self.seq = self.seq.wrapping_add(1);

        (format!("{}-{}", timestamp.timestamp_millis(), self.seq), timestamp)
    }
}
