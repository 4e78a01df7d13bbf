use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::{sync::Mutex, task::JoinHandle, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::aggregation::AggregationController;
use crate::detector::{Detector, SyntheticDetector};
use crate::metrics::{TelemetryCollector, TelemetrySnapshot};
use crate::settings::MonitorSettings;

use super::loop_worker::{detection_loop, LoopContext};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub idle_interval: Duration,
    pub detect_timeout: Duration,
    pub failure_threshold: u32,
    pub system_alert_cooldown: Duration,
    /// Log every n-th throughput report.
    pub report_every: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&MonitorSettings::default())
    }
}

impl From<&MonitorSettings> for SchedulerConfig {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            idle_interval: Duration::from_millis(settings.idle_interval_ms),
            detect_timeout: Duration::from_millis(settings.detect_timeout_ms.max(1)),
            failure_threshold: settings.failure_threshold,
            system_alert_cooldown: Duration::from_secs(settings.system_alert_cooldown_secs),
            report_every: 10,
        }
    }
}

#[derive(Default)]
struct LoopHandle {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

/// Owns the single detection loop.
#[derive(Clone)]
pub struct FrameScheduler {
    detector: Arc<dyn Detector>,
    aggregation: AggregationController,
    telemetry: TelemetryCollector,
    config: SchedulerConfig,
    running: Arc<Mutex<LoopHandle>>,
}

impl FrameScheduler {
    /// With no detector the scheduler runs on synthetic demo output.
    pub fn new(
        detector: Option<Arc<dyn Detector>>,
        aggregation: AggregationController,
        config: SchedulerConfig,
    ) -> Self {
        let detector = detector.unwrap_or_else(|| Arc::new(SyntheticDetector::default()));
        let telemetry = TelemetryCollector::new(detector.source());

        Self {
            detector,
            aggregation,
            telemetry,
            config,
            running: Arc::new(Mutex::new(LoopHandle::default())),
        }
    }

    /// Start the loop. Returns false (and does nothing) if it is already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            return false;
        }

        let cancel_token = CancellationToken::new();
        let ctx = LoopContext {
            detector: Arc::clone(&self.detector),
            aggregation: self.aggregation.clone(),
            telemetry: self.telemetry.clone(),
            config: self.config.clone(),
        };

        running.handle = Some(tokio::spawn(detection_loop(ctx, cancel_token.clone())));
        running.cancel_token = Some(cancel_token);
        info!("frame scheduler started");
        true
    }

    /// Stop the loop and wait for it to exit. A tick already in flight is
    /// allowed to finish; no tick starts after this returns. The handle lock
    /// is held until the loop has joined, so a concurrent `start` waits.
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.lock().await;

        if let Some(token) = running.cancel_token.take() {
            token.cancel();
        }

        match running.handle.take() {
            Some(handle) => {
                handle
                    .await
                    .context("detection loop task failed to join")?;
                info!("frame scheduler stopped");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.get_snapshot().await
    }

    pub fn subscribe_telemetry(&self) -> tokio::sync::watch::Receiver<TelemetrySnapshot> {
        self.telemetry.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{DetectionSource, ScriptStep, ScriptedDetector};
    use crate::models::{AlertKind, BoundingBox, Detection};
    use tokio::time::sleep;

    fn unmasked() -> Detection {
        Detection::new("u", false, 0.9, BoundingBox::default())
    }

    fn scheduler_with(detector: Arc<ScriptedDetector>) -> (FrameScheduler, AggregationController) {
        let aggregation = AggregationController::new();
        let scheduler = FrameScheduler::new(
            Some(detector as Arc<dyn Detector>),
            aggregation.clone(),
            SchedulerConfig::default(),
        );
        (scheduler, aggregation)
    }

    #[tokio::test(start_paused = true)]
    async fn paces_ticks_by_idle_interval() {
        let detector = Arc::new(ScriptedDetector::new(Vec::new()));
        let (scheduler, _) = scheduler_with(detector.clone());

        assert!(scheduler.start().await);
        sleep(Duration::from_millis(1_050)).await;
        scheduler.stop().await.expect("stop");

        // Ticks at 0, 100, ..., 1000ms.
        assert_eq!(detector.call_count(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_does_not_spawn_another_loop() {
        let detector = Arc::new(ScriptedDetector::new(Vec::new()));
        let (scheduler, _) = scheduler_with(detector.clone());

        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        sleep(Duration::from_millis(1_050)).await;
        scheduler.stop().await.expect("stop");

        assert_eq!(detector.call_count(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_after_stop_returns() {
        let detector = Arc::new(ScriptedDetector::new(Vec::new()));
        let (scheduler, _) = scheduler_with(detector.clone());

        scheduler.start().await;
        sleep(Duration::from_millis(250)).await;
        scheduler.stop().await.expect("stop");
        assert!(!scheduler.is_running().await);

        let calls = detector.call_count();
        sleep(Duration::from_secs(2)).await;
        assert_eq!(detector.call_count(), calls);

        // Stopping twice is harmless; restarting works.
        scheduler.stop().await.expect("second stop");
        assert!(scheduler.start().await);
        scheduler.stop().await.expect("stop again");
    }

    #[tokio::test(start_paused = true)]
    async fn start_waits_for_pending_stop() {
        let detector = Arc::new(ScriptedDetector::repeating(ScriptStep::delayed(
            Duration::from_millis(300),
            ScriptStep::Batch(Vec::new()),
        )));
        let (scheduler, _) = scheduler_with(detector.clone());

        assert!(scheduler.start().await);
        sleep(Duration::from_millis(50)).await;

        let stopping = scheduler.clone();
        let stop_task = tokio::spawn(async move { stopping.stop().await });
        sleep(Duration::from_millis(10)).await;

        // The first loop is still inside its 300ms call.
        assert!(scheduler.start().await);
        stop_task.await.expect("join").expect("stop");
        sleep(Duration::from_secs(1)).await;
        scheduler.stop().await.expect("stop");

        assert_eq!(detector.peak_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_tick_finish() {
        let detector = Arc::new(ScriptedDetector::new(vec![ScriptStep::delayed(
            Duration::from_millis(300),
            ScriptStep::Batch(vec![unmasked()]),
        )]));
        let (scheduler, aggregation) = scheduler_with(detector.clone());

        scheduler.start().await;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(detector.call_count(), 1);

        scheduler.stop().await.expect("stop");
        let snapshot = aggregation.get_snapshot().await;
        assert_eq!(snapshot.stats.total_detections, 1);
        assert_eq!(snapshot.alerts.len(), 1);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(detector.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn detector_timeouts_count_as_failures() {
        let detector = Arc::new(ScriptedDetector::repeating(ScriptStep::delayed(
            Duration::from_secs(10),
            ScriptStep::Batch(vec![unmasked()]),
        )));
        let (scheduler, aggregation) = scheduler_with(detector.clone());

        scheduler.start().await;
        // Timeouts at 5.0s, 10.1s and 15.2s; stopped during the idle wait.
        sleep(Duration::from_millis(15_250)).await;
        scheduler.stop().await.expect("stop");
        assert_eq!(detector.call_count(), 3);

        let snapshot = aggregation.get_snapshot().await;
        assert_eq!(snapshot.stats.total_detections, 0);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].kind, AlertKind::System);
        assert_eq!(
            snapshot.alerts[0].message,
            "Detector unavailable: 3 consecutive failures"
        );

        let telemetry = scheduler.telemetry().await;
        assert_eq!(telemetry.failure_count, 3);
        assert_eq!(telemetry.consecutive_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_detector_lowers_throughput() {
        let detector = Arc::new(ScriptedDetector::repeating(ScriptStep::delayed(
            Duration::from_millis(250),
            ScriptStep::Batch(Vec::new()),
        )));
        let (scheduler, _) = scheduler_with(detector.clone());

        scheduler.start().await;
        sleep(Duration::from_millis(3_100)).await;
        scheduler.stop().await.expect("stop");

        // 250ms call + 100ms idle per tick.
        let telemetry = scheduler.telemetry().await;
        assert!((2..=4).contains(&telemetry.fps), "fps {}", telemetry.fps);
        assert_eq!(detector.peak_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_flow_into_aggregation() {
        let detector = Arc::new(ScriptedDetector::new(vec![
            ScriptStep::Batch(vec![unmasked(), unmasked()]),
            ScriptStep::Batch(vec![Detection::new("m", true, 0.9, BoundingBox::default())]),
        ]));
        let (scheduler, aggregation) = scheduler_with(detector);

        scheduler.start().await;
        sleep(Duration::from_millis(150)).await;
        scheduler.stop().await.expect("stop");

        let snapshot = aggregation.get_snapshot().await;
        assert_eq!(snapshot.stats.total_detections, 3);
        assert_eq!(snapshot.stats.compliance_rate, 33);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].message, "2 people detected without face masks");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_failures_raise_one_rate_limited_system_alert() {
        let detector = Arc::new(ScriptedDetector::repeating(ScriptStep::Fail("offline".into())));
        let (scheduler, aggregation) = scheduler_with(detector.clone());

        scheduler.start().await;
        // Four failing ticks: 0, 100, 200, 300ms.
        sleep(Duration::from_millis(350)).await;
        scheduler.stop().await.expect("stop");
        assert_eq!(detector.call_count(), 4);

        let snapshot = aggregation.get_snapshot().await;
        let system: Vec<_> = snapshot
            .alerts
            .iter()
            .filter(|a| a.kind == AlertKind::System)
            .collect();
        assert_eq!(system.len(), 1);
        assert_eq!(snapshot.stats.total_detections, 0);
        assert_eq!(snapshot.stats.alerts_today, 0);

        let telemetry = scheduler.telemetry().await;
        assert_eq!(telemetry.failure_count, 4);
        assert_eq!(telemetry.consecutive_failures, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_then_empty_batch_keeps_loop_alive() {
        let detector = Arc::new(ScriptedDetector::new(vec![
            ScriptStep::Fail("glitch".into()),
            ScriptStep::Batch(Vec::new()),
            ScriptStep::Batch(vec![unmasked()]),
        ]));
        let (scheduler, aggregation) = scheduler_with(detector.clone());

        scheduler.start().await;
        sleep(Duration::from_millis(250)).await;
        scheduler.stop().await.expect("stop");

        let snapshot = aggregation.get_snapshot().await;
        assert_eq!(snapshot.stats.total_detections, 1);
        assert!(snapshot.alerts.iter().all(|a| a.kind == AlertKind::NoMask));
        assert_eq!(scheduler.telemetry().await.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_fps_each_second() {
        let detector = Arc::new(ScriptedDetector::new(Vec::new()));
        let (scheduler, _) = scheduler_with(detector);

        scheduler.start().await;
        sleep(Duration::from_millis(2_050)).await;
        scheduler.stop().await.expect("stop");

        let telemetry = scheduler.telemetry().await;
        assert!((9..=11).contains(&telemetry.fps), "fps {}", telemetry.fps);
        assert_eq!(telemetry.source, DetectionSource::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_synthetic_without_detector() {
        let aggregation = AggregationController::new();
        let scheduler = FrameScheduler::new(None, aggregation.clone(), SchedulerConfig::default());

        scheduler.start().await;
        sleep(Duration::from_millis(50)).await;
        scheduler.stop().await.expect("stop");

        let telemetry = scheduler.telemetry().await;
        assert_eq!(telemetry.source, DetectionSource::Synthetic);
        let processing = telemetry.last_processing_ms.expect("one tick recorded");
        assert!((50.0..150.0).contains(&processing));
        assert!(aggregation.stats().await.total_detections >= 1);
    }
}
