use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{parse_detection_result, DetectionResult, Detector};

/// Replays recorded detector API responses, one JSON document per line,
/// looping back to the first line after the last.
///
/// A line that is not valid JSON fails that tick, like a broken API response.
pub struct ReplayDetector {
    lines: Vec<String>,
    cursor: AtomicUsize,
}

impl ReplayDetector {
    pub fn from_lines(lines: Vec<String>) -> Result<Self> {
        let lines: Vec<String> = lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.is_empty() {
            bail!("replay source has no recorded frames");
        }
        Ok(Self {
            lines,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay file {}", path.display()))?;
        Self::from_lines(contents.lines().map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[async_trait]
impl Detector for ReplayDetector {
    async fn detect(&self) -> Result<DetectionResult> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.lines.len();
        let value: Value = serde_json::from_str(&self.lines[index])
            .with_context(|| format!("recorded frame {index} is not valid JSON"))?;
        Ok(parse_detection_result(&value, Utc::now().timestamp_millis()))
    }
}
