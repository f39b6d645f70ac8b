//! Provider routing, cleaning and mock injection

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::types::{IndexQuote, MarketSnapshot};
use crate::config::Config;
use crate::crash::{FlashCrash, FlashCrashDetector};
use crate::error::ProviderError;
use crate::history::{Admission, SampleHistory};
use crate::provider::{
    select_provider, BinanceProvider, MarketDataProvider, ProviderKind, RegionalProvider,
    YahooProvider,
};
use crate::telemetry;

const MOCK_PROVIDER: &str = "mock";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single entry point for prices, names and market hours
pub struct MarketDataAgent {
    /// US equities and indices
    equity: YahooProvider,

    /// Taiwan listings
    regional: RegionalProvider,

    /// Crypto pairs over the trade stream
    crypto: BinanceProvider,

    /// Cleaned samples per symbol
    history: SampleHistory,

    detector: FlashCrashDetector,

    /// Injected prices that bypass every provider
    mock_prices: Mutex<HashMap<String, Decimal>>,

    /// Display names already looked up
    names: Mutex<HashMap<String, String>>,
}

impl MarketDataAgent {
    /// Build every provider from config
    ///
    /// Simulation mode admits prices without outlier filtering.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let mut history = SampleHistory::new(config.cleaner.clone());
        if config.schedule.simulation {
            history = history.without_outlier_filter();
        }

        Ok(Self {
            equity: YahooProvider::new(&config.provider)?,
            regional: RegionalProvider::new(&config.provider)?,
            crypto: BinanceProvider::new(&config.provider)?,
            history,
            detector: FlashCrashDetector::new(config.flash_crash.clone()),
            mock_prices: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
        })
    }

    fn provider(&self, symbol: &str) -> &dyn MarketDataProvider {
        match select_provider(symbol) {
            ProviderKind::Crypto => &self.crypto,
            ProviderKind::Regional => &self.regional,
            ProviderKind::Equity => &self.equity,
        }
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Inject (or with `None`, remove) a price for a symbol
    pub fn set_mock_price(&self, symbol: &str, price: Option<Decimal>) {
        let mut mocks = lock(&self.mock_prices);
        match price {
            Some(price) => {
                tracing::debug!(%symbol, %price, "Mock price set");
                mocks.insert(symbol.to_string(), price);
            }
            None => {
                mocks.remove(symbol);
            }
        }
    }

    pub fn mock_price(&self, symbol: &str) -> Option<Decimal> {
        lock(&self.mock_prices).get(symbol).copied()
    }

    pub fn is_market_open(&self, symbol: &str) -> bool {
        self.is_market_open_at(symbol, Utc::now())
    }

    /// Mocked symbols always count as open
    pub fn is_market_open_at(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.mock_price(symbol).is_some() || self.provider(symbol).is_market_open(symbol, now)
    }

    pub async fn get_market_data(&self, symbol: &str) -> MarketSnapshot {
        self.get_market_data_at(symbol, Utc::now()).await
    }

    /// Fetch, clean and admit the current price
    ///
    /// Never fails: provider errors become a `None` price.
    pub async fn get_market_data_at(&self, symbol: &str, now: DateTime<Utc>) -> MarketSnapshot {
        let (raw, provider_id) = match self.mock_price(symbol) {
            Some(mock) => (Some(mock), MOCK_PROVIDER),
            None => {
                let provider = self.provider(symbol);
                (self.fetch_price(provider, symbol).await, provider.id())
            }
        };

        let name = self.name(symbol, provider_id == MOCK_PROVIDER).await;
        let is_open = self.is_market_open_at(symbol, now);

        let admission = raw.and_then(|candidate| self.history.clean_and_admit(symbol, candidate, now));
        let outlier_rejected = match admission {
            Some(Admission::Rejected { candidate, .. }) => {
                telemetry::record_outlier_rejected();
                Some(candidate)
            }
            _ => None,
        };
        if raw.is_some() && admission.is_none() {
            tracing::warn!(%symbol, "Non-positive price discarded");
        }

        let price = admission.map(|a| a.price());
        if let Some(price) = price {
            telemetry::set_last_price(price);
        }

        MarketSnapshot {
            symbol: symbol.to_string(),
            name,
            price,
            is_open,
            provider: provider_id,
            outlier_rejected,
            at: now,
        }
    }

    async fn fetch_price(&self, provider: &dyn MarketDataProvider, symbol: &str) -> Option<Decimal> {
        let started = Instant::now();
        match provider.get_price(symbol).await {
            Ok(price) => {
                telemetry::record_fetch_latency(provider.id(), started.elapsed());
                Some(price)
            }
            Err(e) => {
                telemetry::record_provider_failure(provider.id());
                tracing::warn!(%symbol, provider = provider.id(), error = %e, "Price fetch failed");
                None
            }
        }
    }

    /// Cached display name; falls back to the symbol itself
    async fn name(&self, symbol: &str, mocked: bool) -> String {
        let cached = lock(&self.names).get(symbol).cloned();
        if let Some(name) = cached {
            return name;
        }
        if mocked {
            return symbol.to_string();
        }

        match self.provider(symbol).get_name(symbol).await {
            Ok(name) => {
                lock(&self.names).insert(symbol.to_string(), name.clone());
                name
            }
            Err(e) => {
                tracing::debug!(%symbol, error = %e, "Name lookup failed");
                symbol.to_string()
            }
        }
    }

    /// Index price and its change; mock prices report no change
    pub async fn index_quote(&self, symbol: &str) -> Option<IndexQuote> {
        if let Some(price) = self.mock_price(symbol) {
            return Some(IndexQuote {
                symbol: symbol.to_string(),
                price,
                change: None,
            });
        }

        match self.equity.get_quote(symbol).await {
            Ok(quote) => Some(IndexQuote {
                symbol: symbol.to_string(),
                price: quote.price,
                change: quote.change(),
            }),
            Err(e) => {
                tracing::debug!(%symbol, error = %e, "Index quote failed");
                None
            }
        }
    }

    /// Full flash-crash result over the retained history
    pub fn flash_crash_at(
        &self,
        symbol: &str,
        current: Decimal,
        now: DateTime<Utc>,
    ) -> Option<FlashCrash> {
        self.history
            .detect_flash_crash(symbol, current, now, &self.detector)
    }

    pub fn detect_flash_crash(&self, symbol: &str, current: Decimal) -> Option<Decimal> {
        self.detect_flash_crash_at(symbol, current, Utc::now())
    }

    /// Drop rate when a flash crash is confirmed
    pub fn detect_flash_crash_at(
        &self,
        symbol: &str,
        current: Decimal,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        self.flash_crash_at(symbol, current, now).map(|c| c.drop_rate)
    }
}
