//! Detector seam.
//!
//! The real face/mask classifier is external. The scheduler only sees the
//! `Detector` trait, so the synthetic generator, recorded replays and scripted
//! test detectors plug in exactly where a live detector would.

pub mod parse;
pub mod replay;
pub mod scripted;
pub mod synthetic;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Detection;

pub use parse::{parse_detection_result, parse_detections};
pub use replay::ReplayDetector;
pub use scripted::{ScriptStep, ScriptedDetector};
pub use synthetic::SyntheticDetector;

/// Where the figures of a tick came from. Synthetic output must never be
/// presented as live latency or accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    #[default]
    Live,
    Synthetic,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    /// Processing time reported by the detector itself, in milliseconds.
    pub processing_time: Option<f64>,
    pub frame_id: String,
}

#[async_trait]
pub trait Detector: Send + Sync {
    /// One detection batch, possibly empty. `Err` means the call failed.
    async fn detect(&self) -> Result<DetectionResult>;

    fn source(&self) -> DetectionSource {
        DetectionSource::Live
    }
}
