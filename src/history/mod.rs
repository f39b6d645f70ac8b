//! Per-symbol price history
//!
//! Bounded, time-ordered samples per symbol, admitted through an outlier
//! filter that drops single-tick glitches but lets confirmed moves through.

mod store;
mod types;

pub use store::SampleHistory;
pub use types::{Admission, PriceSample};
