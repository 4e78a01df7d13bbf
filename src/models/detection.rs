//! Per-frame detection data models.
//!
//! A `Detection` lives only inside the batch that produced it; the next batch
//! replaces the whole set and nothing is tracked across frames.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Unique within the batch only.
    pub id: String,
    pub has_mask: bool,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(id: impl Into<String>, has_mask: bool, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            id: id.into(),
            has_mask,
            confidence,
            bbox,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.has_mask
    }
}
