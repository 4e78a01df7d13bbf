use std::sync::Arc;

use chrono::Utc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::aggregation::AggregationController;
use crate::detector::{DetectionSource, Detector};
use crate::metrics::{TelemetryCollector, TickMetrics};
use crate::models::AlertKind;

use super::{FailureTracker, FpsWindow, SchedulerConfig};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub(crate) struct LoopContext {
    pub detector: Arc<dyn Detector>,
    pub aggregation: AggregationController,
    pub telemetry: TelemetryCollector,
    pub config: SchedulerConfig,
}

/// Fixed-delay loop: run a tick to completion, then idle for
/// `config.idle_interval` before the next one. Cancellation is only observed
/// between ticks and during the idle wait, never inside a detector call.
pub(crate) async fn detection_loop(ctx: LoopContext, cancel_token: CancellationToken) {
    let mut fps = FpsWindow::new(Instant::now());
    let mut failures =
        FailureTracker::new(ctx.config.failure_threshold, ctx.config.system_alert_cooldown);
    let mut reports: u32 = 0;

    log_info!(
        "detection loop started (idle {}ms, source {:?})",
        ctx.config.idle_interval.as_millis(),
        ctx.detector.source()
    );

    loop {
        if cancel_token.is_cancelled() {
            break;
        }

        run_tick(&ctx, &mut failures).await;

        if let Some(value) = fps.record(Instant::now()) {
            ctx.telemetry.record_fps(value).await;
            reports = reports.wrapping_add(1);
            if reports % ctx.config.report_every.max(1) == 0 {
                log_debug!("detection throughput {value} fps");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(ctx.config.idle_interval) => {}
            _ = cancel_token.cancelled() => break,
        }
    }

    log_info!("detection loop shutting down");
}

async fn run_tick(ctx: &LoopContext, failures: &mut FailureTracker) {
    let t0 = Instant::now();
    let outcome = tokio::time::timeout(ctx.config.detect_timeout, ctx.detector.detect()).await;
    let measured = t0.elapsed();

    match outcome {
        Ok(Ok(result)) => {
            failures.record_success();

            let source = ctx.detector.source();
            let processing_ms = processing_ms(source, result.processing_time, measured);
            let unmasked = result.detections.iter().filter(|d| !d.has_mask).count();

            ctx.telemetry
                .record_tick(TickMetrics {
                    timestamp: Utc::now(),
                    processing_ms,
                    batch_size: result.detections.len(),
                    unmasked,
                    source,
                })
                .await;

            ctx.aggregation.update_detections(result.detections).await;
        }
        Ok(Err(err)) => {
            log_error!("detector call failed: {err:?}");
            on_failure(ctx, failures).await;
        }
        Err(_) => {
            log_warn!(
                "detector call timed out (> {}ms)",
                ctx.config.detect_timeout.as_millis()
            );
            on_failure(ctx, failures).await;
        }
    }
}

async fn on_failure(ctx: &LoopContext, failures: &mut FailureTracker) {
    let should_alert = failures.record_failure(Instant::now());
    let consecutive = failures.consecutive();
    ctx.telemetry.record_failure(consecutive).await;

    if should_alert {
        log_warn!("raising system alert after {consecutive} consecutive detector failures");
        ctx.aggregation
            .raise_alert(
                AlertKind::System,
                format!("Detector unavailable: {consecutive} consecutive failures"),
            )
            .await;
    }
}

/// Synthetic output reports its own timing; for a live detector the measured
/// wall time of the call is the figure.
fn processing_ms(source: DetectionSource, reported: Option<f64>, measured: Duration) -> f64 {
    match (source, reported) {
        (DetectionSource::Synthetic, Some(reported)) => reported,
        _ => measured.as_micros() as f64 / 1_000.0,
    }
}
