//! Polling loop and the state it exposes to collaborators
//!
//! [`Monitor`] re-reads [`SharedConfig`] every tick, fetches and cleans the
//! price, checks for a flash crash, runs the alert state machine and fans
//! the outcome out as [`AlertEvent`](crate::alert::AlertEvent)s.

mod runner;
mod shared;
mod status;

pub use runner::{Monitor, TickReport};
pub use shared::{normalize_symbol, parse_price, AlertConfigUpdate, SharedConfig};
pub use status::{LogRing, MonitorStatus};
