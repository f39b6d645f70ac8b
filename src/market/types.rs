//! Snapshot types returned to the monitor and the CLI

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Pull-based view of one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub name: String,
    /// Cleaned price; `None` when the provider had nothing usable
    pub price: Option<Decimal>,
    pub is_open: bool,
    /// Provider id, or "mock" for injected prices
    pub provider: &'static str,
    /// Raw candidate the outlier filter threw away this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_rejected: Option<Decimal>,
    pub at: DateTime<Utc>,
}

/// Secondary index shown next to the watched symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexQuote {
    pub symbol: String,
    pub price: Decimal,
    /// Change against the previous close, when the source reports one
    pub change: Option<Decimal>,
}
