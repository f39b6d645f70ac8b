//! Market data providers
//!
//! One adapter per market category, all behind [`MarketDataProvider`].
//! [`select_provider`] maps a symbol to the adapter that serves it.

mod crypto;
mod equity;
mod hours;
mod regional;
mod selector;

pub use crypto::{binance_pair, crypto_display_name, BinanceProvider};
pub use equity::{Quote, YahooProvider};
pub use hours::TradingWindow;
pub use regional::RegionalProvider;
pub use selector::{select_provider, ProviderKind};

use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price, name and trading-hours queries for one market category
///
/// Implementations never panic on I/O; failures come back as
/// [`ProviderError`] and the caller decides how to degrade.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Stable identifier used in snapshots and metrics
    fn id(&self) -> &'static str;

    /// Latest positive price for the symbol
    async fn get_price(&self, symbol: &str) -> Result<Decimal, ProviderError>;

    /// Human-readable instrument name
    async fn get_name(&self, symbol: &str) -> Result<String, ProviderError>;

    /// Whether the symbol's market trades at `now`
    fn is_market_open(&self, symbol: &str, now: DateTime<Utc>) -> bool;
}

/// Convert a JSON float into a positive price
pub(crate) fn positive_price(value: f64) -> Option<Decimal> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Decimal::try_from(value).ok().map(|d| d.round_dp(6))
}
