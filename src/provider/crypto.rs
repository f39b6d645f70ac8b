//! Binance crypto prices: trade stream with REST fallback

use super::MarketDataProvider;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Binance trade message structure
#[derive(Debug, Deserialize)]
struct TradeMessage {
    /// Event type
    #[serde(rename = "e")]
    event_type: String,
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
}

/// REST ticker response
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Last streamed price and when it arrived
#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    price: Decimal,
    at: Instant,
}

/// Subscription and cache, guarded by one mutex per provider
#[derive(Default)]
struct StreamState {
    /// Pair the live subscription belongs to
    pair: Option<String>,
    last: Option<CachedPrice>,
    task: Option<JoinHandle<()>>,
}

impl StreamState {
    fn fresh_price(&self, now: Instant, max_age: Duration) -> Option<Decimal> {
        self.last
            .filter(|cached| now.saturating_duration_since(cached.at) < max_age)
            .map(|cached| cached.price)
    }

    /// Store a price unless it belongs to a pair we already switched away from
    fn record(&mut self, pair: &str, price: Decimal, at: Instant) {
        if self.pair.as_deref() == Some(pair) {
            self.last = Some(CachedPrice { price, at });
        }
    }

    fn is_streaming(&self, pair: &str) -> bool {
        self.pair.as_deref() == Some(pair)
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

fn lock(state: &Mutex<StreamState>) -> MutexGuard<'_, StreamState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Normalize a user symbol into a Binance pair
///
/// `BTC-USD` becomes `BTCUSDT`, `ETH-BTC` becomes `ETHBTC`.
pub fn binance_pair(symbol: &str) -> String {
    let pair = symbol.trim().replace('-', "").to_uppercase();
    match pair.strip_suffix("USD") {
        Some(base) => format!("{}USDT", base),
        None => pair,
    }
}

/// Display name for a crypto symbol, e.g. `BTC (Crypto)`
pub fn crypto_display_name(symbol: &str) -> String {
    let base = symbol.split('-').next().unwrap_or(symbol).trim();
    format!("{} (Crypto)", base.to_uppercase())
}

fn parse_trade(msg: &str) -> Option<(String, Decimal)> {
    let trade: TradeMessage = serde_json::from_str(msg).ok()?;
    if trade.event_type != "trade" {
        return None;
    }
    let price = Decimal::from_str(&trade.price).ok()?;
    (price > Decimal::ZERO).then_some((trade.symbol, price))
}

fn parse_ticker(body: &str) -> Result<Decimal, ProviderError> {
    let ticker: TickerPrice = serde_json::from_str(body)
        .map_err(|e| ProviderError::Unavailable(format!("bad ticker payload: {}", e)))?;
    let price = Decimal::from_str(&ticker.price)
        .map_err(|e| ProviderError::Unavailable(format!("bad ticker price: {}", e)))?;
    if price <= Decimal::ZERO {
        return Err(ProviderError::NoData(ticker.price));
    }
    Ok(price)
}

/// Crypto prices from a live trade stream, REST when the stream is cold
///
/// Holds at most one subscription. Asking for a different pair tears down
/// the old stream and serves that first request over REST while the new
/// stream warms up.
pub struct BinanceProvider {
    client: Client,
    rest_url: String,
    ws_url: String,
    freshness: Duration,
    state: Arc<Mutex<StreamState>>,
}

impl BinanceProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            rest_url: config.binance_rest_url.trim_end_matches('/').to_string(),
            ws_url: config.binance_ws_url.trim_end_matches('/').to_string(),
            freshness: Duration::from_secs(config.crypto_freshness_secs),
            state: Arc::new(Mutex::new(StreamState::default())),
        })
    }

    /// Build the WebSocket URL for the trade stream
    fn stream_url(&self, pair: &str) -> String {
        format!("{}/{}@trade", self.ws_url, pair.to_lowercase())
    }

    /// Point the subscription at `pair`, returning true if it had to switch
    fn ensure_stream(&self, pair: &str) -> bool {
        let mut state = lock(&self.state);
        if state.is_streaming(pair) {
            return false;
        }

        if let Some(old) = state.task.take() {
            tracing::info!(from = ?state.pair, to = %pair, "Switching Binance stream");
            old.abort();
        }
        state.pair = Some(pair.to_string());
        state.last = None;

        let url = self.stream_url(pair);
        let shared = Arc::clone(&self.state);
        let owned_pair = pair.to_string();
        state.task = Some(tokio::spawn(async move {
            Self::run_stream(url, owned_pair, shared).await;
        }));
        true
    }

    /// Feed trade prices into the cache until the stream ends or is aborted
    async fn run_stream(url: String, pair: String, state: Arc<Mutex<StreamState>>) {
        let client = WsClient::new(
            WsConfig::new(url)
                .max_reconnects(0)
                .initial_delay(Duration::from_secs(1))
                .max_delay(Duration::from_secs(30)),
        );
        let mut rx = client.connect();

        while let Some(msg) = rx.recv().await {
            match msg {
                WsMessage::Text(text) => {
                    if let Some((symbol, price)) = parse_trade(&text) {
                        if symbol == pair {
                            lock(&state).record(&pair, price, Instant::now());
                        }
                    }
                }
                WsMessage::Connected => tracing::info!(%pair, "Binance stream connected"),
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(%pair, attempt, "Binance stream reconnecting")
                }
                WsMessage::Disconnected => {
                    tracing::warn!(%pair, "Binance stream disconnected");
                    break;
                }
            }
        }
    }

    async fn fetch_rest(&self, pair: &str) -> Result<Decimal, ProviderError> {
        let url = format!("{}/api/v3/ticker/price", self.rest_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", pair)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "binance returned {} for {}",
                response.status(),
                pair
            )));
        }

        let price = parse_ticker(&response.text().await?)?;
        lock(&self.state).record(pair, price, Instant::now());
        Ok(price)
    }
}

impl Drop for BinanceProvider {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.state).task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    fn id(&self) -> &'static str {
        "binance"
    }

    async fn get_price(&self, symbol: &str) -> Result<Decimal, ProviderError> {
        let pair = binance_pair(symbol);

        if self.ensure_stream(&pair) {
            return self.fetch_rest(&pair).await;
        }

        let cached = lock(&self.state).fresh_price(Instant::now(), self.freshness);
        if let Some(price) = cached {
            return Ok(price);
        }

        tracing::debug!(%pair, "Streamed price stale, using REST");
        self.fetch_rest(&pair).await
    }

    async fn get_name(&self, symbol: &str) -> Result<String, ProviderError> {
        Ok(crypto_display_name(symbol))
    }

    fn is_market_open(&self, _symbol: &str, _now: DateTime<Utc>) -> bool {
        true
    }
}
