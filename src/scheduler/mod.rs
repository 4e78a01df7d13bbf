pub mod controller;
pub mod failures;
pub mod fps;
pub mod loop_worker;

pub use controller::{FrameScheduler, SchedulerConfig};
pub use failures::FailureTracker;
pub use fps::FpsWindow;
