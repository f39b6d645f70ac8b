//! Market data agent
//!
//! Routes each symbol to its provider, cleans what comes back into the
//! sample history, and answers flash-crash queries against that history.
//! A mock price injected per symbol bypasses the providers entirely.

mod agent;
mod types;

pub use agent::MarketDataAgent;
pub use types::{IndexQuote, MarketSnapshot};
