//! Taiwan-listed equities

use super::{MarketDataProvider, TradingWindow, YahooProvider};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Yahoo-backed prices with TWSE session hours
pub struct RegionalProvider {
    inner: YahooProvider,
}

impl RegionalProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let inner = YahooProvider::new(config)?.with_window(TradingWindow::taiwan());
        Ok(Self { inner })
    }
}

#[async_trait]
impl MarketDataProvider for RegionalProvider {
    fn id(&self) -> &'static str {
        "twse"
    }

    async fn get_price(&self, symbol: &str) -> Result<Decimal, ProviderError> {
        self.inner.get_price(symbol).await
    }

    async fn get_name(&self, symbol: &str) -> Result<String, ProviderError> {
        self.inner.get_name(symbol).await
    }

    fn is_market_open(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.inner.is_market_open(symbol, now)
    }
}
