//! Alert state machine
//!
//! Binds a direction of interest from the first clean price, evaluates
//! stop-loss and target thresholds each tick with a shared cooldown, and
//! runs a cancelable repeating alarm for target hits.

mod alarm;
mod machine;
mod types;

pub use alarm::Alarm;
pub use machine::AlertStateMachine;
pub use types::{AlertConfig, AlertDecision, AlertEvent, AlertKind, AlertMode, AlertState};
