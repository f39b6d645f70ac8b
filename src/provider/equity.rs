//! Yahoo Finance chart API adapter

use super::{positive_price, MarketDataProvider, TradingWindow};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Price plus the previous session close, when reported
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    pub previous_close: Option<Decimal>,
}

impl Quote {
    /// Change against the previous close
    pub fn change(&self) -> Option<Decimal> {
        self.previous_close.map(|prev| self.price - prev)
    }
}

/// Equity and index prices from the Yahoo chart endpoint
///
/// Price lookup tries, in order: the live `regularMarketPrice` field, the
/// last close of the 1-day/1-minute series, the last close of the
/// 5-day/daily series.
pub struct YahooProvider {
    client: Client,
    base_url: String,
    window: TradingWindow,
}

impl YahooProvider {
    /// Create a provider using US market hours
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; stocklight)")
            .build()?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
            window: TradingWindow::us(),
        })
    }

    /// Use a different trading window for the open check
    pub fn with_window(mut self, window: TradingWindow) -> Self {
        self.window = window;
        self
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProviderError::Unavailable(format!("bad base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Unavailable("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<ChartResult, ProviderError> {
        let url = self.chart_url(symbol)?;
        tracing::debug!(%symbol, range, interval, "Fetching Yahoo chart");

        let response = self
            .client
            .get(url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "yahoo returned {} for {}",
                response.status(),
                symbol
            )));
        }

        let body = response.text().await?;
        parse_chart(&body, symbol)
    }

    /// Price and previous close in one request
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let chart = self.fetch_chart(symbol, "1d", "1m").await?;
        let price = chart
            .market_price()
            .or_else(|| chart.last_close())
            .ok_or_else(|| ProviderError::NoData(symbol.to_string()))?;

        Ok(Quote {
            price,
            previous_close: chart.previous_close(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        "yahoo"
    }

    async fn get_price(&self, symbol: &str) -> Result<Decimal, ProviderError> {
        match self.fetch_chart(symbol, "1d", "1m").await {
            Ok(chart) => {
                if let Some(price) = chart.market_price().or_else(|| chart.last_close()) {
                    return Ok(price);
                }
                tracing::debug!(%symbol, "No intraday price, trying daily series");
            }
            Err(e) => {
                tracing::debug!(%symbol, error = %e, "Intraday chart failed, trying daily series");
            }
        }

        let daily = self.fetch_chart(symbol, "5d", "1d").await?;
        daily
            .last_close()
            .ok_or_else(|| ProviderError::NoData(symbol.to_string()))
    }

    async fn get_name(&self, symbol: &str) -> Result<String, ProviderError> {
        let chart = self.fetch_chart(symbol, "1d", "1d").await?;
        chart
            .display_name()
            .ok_or_else(|| ProviderError::NoData(symbol.to_string()))
    }

    fn is_market_open(&self, _symbol: &str, now: DateTime<Utc>) -> bool {
        self.window.is_open_at(now)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResult {
    fn market_price(&self) -> Option<Decimal> {
        self.meta.regular_market_price.and_then(positive_price)
    }

    fn last_close(&self) -> Option<Decimal> {
        self.indicators
            .as_ref()?
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .find_map(|c| c.and_then(positive_price))
    }

    fn previous_close(&self) -> Option<Decimal> {
        self.meta
            .previous_close
            .or(self.meta.chart_previous_close)
            .and_then(positive_price)
    }

    fn display_name(&self) -> Option<String> {
        self.meta
            .long_name
            .as_deref()
            .or(self.meta.short_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

fn parse_chart(body: &str, symbol: &str) -> Result<ChartResult, ProviderError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Unavailable(format!("bad chart payload: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(ProviderError::Unavailable(format!(
            "{}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        )));
    }

    response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::NoData(symbol.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const INTRADAY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "symbol": "2330.TW",
                    "regularMarketPrice": 582.0,
                    "chartPreviousClose": 575.0,
                    "longName": "Taiwan Semiconductor Manufacturing Company Limited",
                    "shortName": "TAIWAN SEMICONDUCTOR MANUFACTUR"
                },
                "timestamp": [1704243600, 1704243660, 1704243720],
                "indicators": {"quote": [{"close": [580.0, 581.0, null]}]}
            }],
            "error": null
        }
    }"#;

    fn provider() -> YahooProvider {
        YahooProvider::new(&ProviderConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_market_price() {
        let chart = parse_chart(INTRADAY, "2330.TW").unwrap();
        assert_eq!(chart.market_price(), Some(dec!(582)));
        assert_eq!(chart.previous_close(), Some(dec!(575)));
    }

    #[test]
    fn test_last_close_skips_nulls() {
        let chart = parse_chart(INTRADAY, "2330.TW").unwrap();
        assert_eq!(chart.last_close(), Some(dec!(581)));
    }

    #[test]
    fn test_display_name_prefers_long_name() {
        let chart = parse_chart(INTRADAY, "2330.TW").unwrap();
        assert_eq!(
            chart.display_name().as_deref(),
            Some("Taiwan Semiconductor Manufacturing Company Limited")
        );
    }

    #[test]
    fn test_missing_market_price_falls_back_to_close() {
        let body = r#"{"chart":{"result":[{"meta":{"shortName":"Apple Inc."},
            "indicators":{"quote":[{"close":[189.5,190.25]}]}}],"error":null}}"#;
        let chart = parse_chart(body, "AAPL").unwrap();
        assert!(chart.market_price().is_none());
        assert_eq!(chart.last_close(), Some(dec!(190.25)));
        assert_eq!(chart.display_name().as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_non_positive_prices_ignored() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":0.0},
            "indicators":{"quote":[{"close":[null,-1.0]}]}}],"error":null}}"#;
        let chart = parse_chart(body, "XYZ").unwrap();
        assert!(chart.market_price().is_none());
        assert!(chart.last_close().is_none());
    }

    #[test]
    fn test_chart_error_is_unavailable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found",
            "description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body, "NOPE").unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[test]
    fn test_empty_result_is_no_data() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        let err = parse_chart(body, "NOPE").unwrap_err();
        assert!(matches!(err, ProviderError::NoData(_)));
    }

    #[test]
    fn test_garbage_payload() {
        assert!(matches!(
            parse_chart("<html>", "AAPL"),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn test_chart_url() {
        let url = provider().chart_url("2330.TW").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/2330.TW"
        );
    }

    #[test]
    fn test_chart_url_with_trailing_slash_base() {
        let config = ProviderConfig {
            yahoo_base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let provider = YahooProvider::new(&config).unwrap();
        let url = provider.chart_url("AAPL").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v8/finance/chart/AAPL");
    }

    #[test]
    fn test_quote_change() {
        let quote = Quote {
            price: dec!(17850),
            previous_close: Some(dec!(17800)),
        };
        assert_eq!(quote.change(), Some(dec!(50)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let config = ProviderConfig {
            yahoo_base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 1,
            ..Default::default()
        };
        let provider = YahooProvider::new(&config).unwrap();
        let err = provider.get_price("AAPL").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
