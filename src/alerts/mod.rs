pub mod buffer;
pub mod stamper;

pub use buffer::{AlertBuffer, ALERT_CAPACITY};
pub use stamper::AlertStamper;
