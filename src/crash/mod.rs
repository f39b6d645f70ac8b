//! Flash-crash detection
//!
//! Flags a sharp intra-minute decline that is also a statistical outlier
//! against the recently retained price history.

mod detector;
mod types;

pub use detector::FlashCrashDetector;
pub use types::FlashCrash;
