use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{Local, Utc};
use log::{debug, info};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::models::{Alert, AlertKind, Detection, Stats};
use crate::relay::{InboundEvent, OutboundEvent, Relay};

use super::{AggregationState, MonitorSnapshot};

/// Single owner of the aggregation state.
///
/// Every mutation takes the lock, applies in full, and publishes a fresh
/// snapshot before releasing it, so readers never see a half-applied update.
#[derive(Clone)]
pub struct AggregationController {
    state: Arc<Mutex<AggregationState>>,
    snapshot_tx: Arc<watch::Sender<MonitorSnapshot>>,
    relay: Option<Arc<dyn Relay>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    started_at: Instant,
}

impl AggregationController {
    pub fn new() -> Self {
        let state = AggregationState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            state: Arc::new(Mutex::new(state)),
            snapshot_tx: Arc::new(snapshot_tx),
            relay: None,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            started_at: Instant::now(),
        }
    }

    pub fn with_relay(mut self, relay: Arc<dyn Relay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn get_snapshot(&self) -> MonitorSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn stats(&self) -> Stats {
        self.state.lock().await.stats()
    }

    pub async fn update_detections(&self, batch: Vec<Detection>) -> Option<Alert> {
        let outbound = self
            .relay
            .as_ref()
            .filter(|relay| relay.is_connected())
            .map(|_| batch.clone());

        let mut state = self.state.lock().await;
        let alert = state.update_detections(batch, Utc::now());
        self.publish(&state);

        // Still under the lock so the relay sees batches in applied order.
        if let (Some(relay), Some(detections)) = (self.relay.as_ref(), outbound) {
            relay.publish(OutboundEvent::FrameProcessed {
                detections,
                timestamp: Utc::now().timestamp_millis(),
            });
        }

        alert
    }

    pub async fn raise_alert(&self, kind: AlertKind, message: impl Into<String>) -> Alert {
        let mut state = self.state.lock().await;
        let alert = state.raise_alert(kind, message, Utc::now());
        self.publish(&state);
        debug!("{} alert raised: {}", kind.as_str(), alert.message);
        alert
    }

    pub async fn dismiss_alert(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.dismiss_alert(id);
        if removed {
            self.publish(&state);
        }
        removed
    }

    pub async fn clear_all_alerts(&self) -> usize {
        let mut state = self.state.lock().await;
        let removed = state.clear_alerts();
        if removed > 0 {
            self.publish(&state);
        }
        removed
    }

    /// Route an event pushed in by the transport.
    pub async fn apply_inbound(&self, event: InboundEvent) {
        match event {
            InboundEvent::DetectionResult { detections } => {
                self.update_detections(detections).await;
            }
            InboundEvent::Alert { kind, message } => {
                self.raise_alert(kind, message).await;
            }
        }
    }

    /// Decode and route a raw transport message. Only a broken envelope fails.
    pub async fn apply_inbound_json(&self, text: &str) -> Result<()> {
        let event = InboundEvent::from_json(text)?;
        self.apply_inbound(event).await;
        Ok(())
    }

    /// Start the one-second uptime ticker. Also resets `alerts_today` when the
    /// local date changes. Replaces any previous ticker.
    pub async fn start_uptime_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;

                let uptime = controller.started_at.elapsed().as_secs();
                let mut state = controller.state.lock().await;
                state.set_uptime(uptime);
                if state.roll_day(Local::now().date_naive()) {
                    info!("local day changed; alerts_today reset");
                }
                controller.publish(&state);
            }
        });

        *ticker_guard = Some(handle);
        debug!("uptime ticker started");
    }

    pub async fn stop_uptime_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn publish(&self, state: &AggregationState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}

impl Default for AggregationController {
    fn default() -> Self {
        Self::new()
    }
}
