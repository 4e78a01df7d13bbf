pub mod controller;
pub mod state;

pub use controller::AggregationController;
pub use state::{no_mask_message, AggregationState, MonitorSnapshot};
