//! Collaborator seams: the indicator actuator and the narrator
//!
//! Only the interfaces and thin log/command/in-memory implementations live
//! here. Real device drivers and TTS engines plug in behind the traits.

mod driver;
mod indicator;
mod narrator;

pub use driver::IndicatorDriver;
pub use indicator::{Indicator, IndicatorState, LogIndicator, RecordingIndicator};
pub use narrator::{CommandNarrator, LogNarrator, Narrator, RecordingNarrator};
