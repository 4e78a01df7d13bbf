pub mod alert;
pub mod detection;
pub mod stats;

pub use alert::{Alert, AlertKind};
pub use detection::{BoundingBox, Detection};
pub use stats::Stats;
