use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::models::{BoundingBox, Detection};

use super::{DetectionResult, DetectionSource, Detector};

/// Offline stand-in for a real detector: 1-3 faces, ~70% masked.
pub struct SyntheticDetector {
    rng: Mutex<StdRng>,
}

impl SyntheticDetector {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }

    pub fn generate(&self) -> DetectionResult {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now_ms = Utc::now().timestamp_millis();
        let faces = rng.gen_range(1..=3);

        let detections = (0..faces)
            .map(|i| {
                Detection::new(
                    format!("mock-{now_ms}-{i}"),
                    rng.gen_bool(0.7),
                    rng.gen_range(0.75..=1.0),
                    BoundingBox {
                        x: rng.gen_range(50.0..450.0),
                        y: rng.gen_range(50.0..250.0),
                        width: rng.gen_range(80.0..120.0),
                        height: rng.gen_range(100.0..150.0),
                    },
                )
            })
            .collect();

        DetectionResult {
            detections,
            processing_time: Some(rng.gen_range(50.0..150.0)),
            frame_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for SyntheticDetector {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Detector for SyntheticDetector {
    async fn detect(&self) -> Result<DetectionResult> {
        Ok(self.generate())
    }

    fn source(&self) -> DetectionSource {
        DetectionSource::Synthetic
    }
}
