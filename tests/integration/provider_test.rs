//! Provider routing and trading hours

use chrono::{DateTime, Utc};
use stocklight::provider::{
    binance_pair, crypto_display_name, select_provider, ProviderKind, TradingWindow,
};

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[test]
fn test_routing_table() {
    let cases = [
        ("BTC-USD", ProviderKind::Crypto),
        ("eth-btc", ProviderKind::Crypto),
        ("SOLUSDT", ProviderKind::Crypto),
        ("2330.TW", ProviderKind::Regional),
        ("6488.TWO", ProviderKind::Regional),
        ("AAPL", ProviderKind::Equity),
        ("^TWII", ProviderKind::Equity),
    ];
    for (symbol, expected) in cases {
        assert_eq!(select_provider(symbol), expected, "{}", symbol);
        assert_eq!(select_provider(symbol), select_provider(symbol));
    }
}

#[test]
fn test_binance_naming() {
    assert_eq!(binance_pair("BTC-USD"), "BTCUSDT");
    assert_eq!(binance_pair("ETH-BTC"), "ETHBTC");
    assert_eq!(binance_pair("SOLUSDT"), "SOLUSDT");
    assert_eq!(crypto_display_name("btc-usd"), "BTC (Crypto)");
}

#[test]
fn test_sessions() {
    // Monday 2024-06-03
    let taiwan = TradingWindow::taiwan();
    assert!(taiwan.is_open_at(at("2024-06-03T02:00:00Z")));
    assert!(!taiwan.is_open_at(at("2024-06-03T06:00:00Z")));

    let us = TradingWindow::us();
    assert!(us.is_open_at(at("2024-06-03T14:00:00Z")));
    assert!(!us.is_open_at(at("2024-06-03T12:00:00Z")));
    // Saturday
    assert!(!us.is_open_at(at("2024-06-08T14:00:00Z")));
}
