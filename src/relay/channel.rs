use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;
use tokio::sync::mpsc;

use super::{OutboundEvent, Relay};

/// In-process transport endpoint backed by a bounded channel.
///
/// The owning transport flips `connected`; while it is false, or while the
/// queue is full, publishes are dropped.
#[derive(Clone)]
pub struct ChannelRelay {
    tx: mpsc::Sender<OutboundEvent>,
    connected: Arc<AtomicBool>,
}

impl ChannelRelay {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let relay = Self {
            tx,
            connected: Arc::new(AtomicBool::new(false)),
        };
        (relay, rx)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Relay for ChannelRelay {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.tx.is_closed()
    }

    fn publish(&self, event: OutboundEvent) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                debug!("relay dropped outbound event: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> OutboundEvent {
        OutboundEvent::FrameProcessed {
            detections: Vec::new(),
            timestamp: 0,
        }
    }

    #[test]
    fn disconnected_publishes_are_dropped_not_queued() {
        let (relay, mut rx) = ChannelRelay::new(4);
        assert!(!relay.publish(event()));

        relay.set_connected(true);
        assert!(rx.try_recv().is_err());
        assert!(relay.publish(event()));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn full_queue_drops() {
        let (relay, _rx) = ChannelRelay::new(1);
        relay.set_connected(true);
        assert!(relay.publish(event()));
        assert!(!relay.publish(event()));
    }

    #[test]
    fn closed_receiver_reads_as_disconnected() {
        let (relay, rx) = ChannelRelay::new(1);
        relay.set_connected(true);
        drop(rx);
        assert!(!relay.is_connected());
    }
}
