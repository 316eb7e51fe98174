pub mod rate;
pub mod timer;

pub use rate::{read_deltas, FrameLog, RateSummary, DEFAULT_MIN_RATE_HZ};
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
