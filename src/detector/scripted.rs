use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::time::Duration;

use crate::models::Detection;

use super::{DetectionResult, DetectionSource, Detector};

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Batch(Vec<Detection>),
    Fail(String),
    /// Sleep, then resolve the wrapped step.
    Delay(Duration, Box<ScriptStep>),
}

impl ScriptStep {
    pub fn delayed(delay: Duration, step: ScriptStep) -> Self {
        ScriptStep::Delay(delay, Box::new(step))
    }
}

/// Plays back a fixed sequence of batches and failures, then repeats `tail`
/// forever. Deterministic replacement for the live detector.
pub struct ScriptedDetector {
    steps: Mutex<VecDeque<ScriptStep>>,
    tail: ScriptStep,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedDetector {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self::with_tail(steps, ScriptStep::Batch(Vec::new()))
    }

    pub fn repeating(step: ScriptStep) -> Self {
        Self::with_tail(Vec::new(), step)
    }

    pub fn with_tail(steps: Vec<ScriptStep>, tail: ScriptStep) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            tail,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `detect` calls that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> ScriptStep {
        let mut steps = match self.steps.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        steps.pop_front().unwrap_or_else(|| self.tail.clone())
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self) -> Result<DetectionResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(self);

        let mut step = self.next_step();
        loop {
            match step {
                ScriptStep::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
                ScriptStep::Batch(detections) => {
                    return Ok(DetectionResult {
                        detections,
                        processing_time: None,
                        frame_id: format!("scripted-{call}"),
                    })
                }
                ScriptStep::Fail(reason) => {
                    return Err(anyhow!("scripted detector failure: {reason}"))
                }
            }
        }
    }

    fn source(&self) -> DetectionSource {
        DetectionSource::Live
    }
}

/// Counts a call as in flight until dropped, including when the caller gives
/// up on the future (timeouts).
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(detector: &'a ScriptedDetector) -> Self {
        let now = detector.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        detector.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(&detector.in_flight)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
