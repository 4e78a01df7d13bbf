pub mod aggregation;
pub mod alerts;
pub mod detector;
pub mod metrics;
pub mod models;
pub mod relay;
pub mod scheduler;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use aggregation::AggregationController;
use anyhow::{Context, Result};
use detector::{Detector, ReplayDetector, SyntheticDetector};
use log::{debug, info, warn};
use relay::{ChannelRelay, Relay};
use scheduler::{FrameScheduler, SchedulerConfig};
use settings::{DetectorMode, MonitorSettings, SettingsStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration};

const REPORT_INTERVAL_SECS: u64 = 5;

pub(crate) struct AppState {
    aggregation: AggregationController,
    scheduler: FrameScheduler,
    relay: ChannelRelay,
}

pub fn run() -> Result<()> {
    let debug_mode = settings::debug_mode();
    utils::logging::init_logging(debug_mode);

    info!("maskwatch starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(serve(debug_mode));
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Pick the detector named in settings. `None` leaves the scheduler on its
/// synthetic fallback.
fn build_detector(settings: &MonitorSettings) -> Result<Option<Arc<dyn Detector>>> {
    match (settings.detector, settings.replay_path.as_ref()) {
        (DetectorMode::Synthetic, _) => Ok(Some(Arc::new(SyntheticDetector::new(
            settings.synthetic_seed,
        )))),
        (DetectorMode::Replay, Some(path)) => {
            let replay = ReplayDetector::from_file(path)?;
            info!("replaying {} recorded frames from {}", replay.len(), path.display());
            Ok(Some(Arc::new(replay)))
        }
        (DetectorMode::Replay, None) => {
            warn!("replay detector selected without replayPath; using synthetic output");
            Ok(None)
        }
    }
}

fn build_state(settings: &MonitorSettings, debug_mode: bool) -> Result<AppState> {
    let (relay, outbound_rx) = ChannelRelay::new(settings.relay_capacity);
    let aggregation = AggregationController::new().with_relay(Arc::new(relay.clone()));

    let mut config = SchedulerConfig::from(settings);
    if debug_mode {
        config.report_every = 1;
    }
    let scheduler = FrameScheduler::new(build_detector(settings)?, aggregation.clone(), config);

    spawn_relay_drain(outbound_rx);

    Ok(AppState {
        aggregation,
        scheduler,
        relay,
    })
}

/// Stand-in for the socket writer: outbound events are logged.
fn spawn_relay_drain(mut outbound_rx: tokio::sync::mpsc::Receiver<relay::OutboundEvent>) {
    tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => debug!("relay -> {json}"),
                Err(err) => warn!("failed to encode outbound event: {err}"),
            }
        }
    });
}

/// Stand-in for the socket reader: one inbound JSON event per stdin line.
fn spawn_inbound_reader(aggregation: AggregationController) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    if let Err(err) = aggregation.apply_inbound_json(&line).await {
                        warn!("ignoring inbound event: {err:#}");
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("inbound reader stopped: {err}");
                    break;
                }
            }
        }
    });
}

async fn serve(debug_mode: bool) -> Result<()> {
    let settings_store = SettingsStore::from_env()?;
    let settings = settings_store.settings();
    let state = build_state(&settings, debug_mode)?;

    state.relay.set_connected(true);
    state.aggregation.start_uptime_ticker().await;
    state.scheduler.start().await;
    spawn_inbound_reader(state.aggregation.clone());

    let telemetry_rx = state.scheduler.subscribe_telemetry();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut report = interval(Duration::from_secs(REPORT_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let stats = state.aggregation.stats().await;
                let telemetry = telemetry_rx.borrow().clone();
                let relay = if state.relay.is_connected() { "connected" } else { "disconnected" };
                info!(
                    "detections={} compliance={}% alerts_today={} uptime={}s",
                    stats.total_detections, stats.compliance_rate, stats.alerts_today, stats.uptime,
                );
                info!(
                    "fps={} latency={:.1}ms ({:?}) relay={relay}",
                    telemetry.fps,
                    telemetry.last_processing_ms.unwrap_or_default(),
                    telemetry.source,
                );
            }
            signal = &mut shutdown => {
                signal.context("failed to listen for ctrl-c")?;
                info!("shutdown requested");
                break;
            }
        }
    }

    state.relay.set_connected(false);
    state.scheduler.stop().await?;
    state.aggregation.stop_uptime_ticker().await;

    info!("maskwatch stopped");
    Ok(())
}
