//! Transport seam.
//!
//! Connection management lives outside this crate. Outbound events are dropped
//! when the transport is disconnected, never queued for later.

pub mod channel;
pub mod events;

pub use channel::ChannelRelay;
pub use events::{InboundEvent, OutboundEvent};

pub trait Relay: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Returns false when the event was dropped.
    fn publish(&self, event: OutboundEvent) -> bool;
}
