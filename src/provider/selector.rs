//! Symbol to provider routing

use serde::Serialize;

/// Which adapter serves a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Generic equities and indices
    Equity,
    /// Taiwan-listed equities
    Regional,
    /// Crypto pairs
    Crypto,
}

impl ProviderKind {
    /// Identifier of the adapter behind this kind
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Equity => "yahoo",
            ProviderKind::Regional => "twse",
            ProviderKind::Crypto => "binance",
        }
    }
}

/// Pick the provider for a symbol from its lexical form
///
/// First match wins: crypto pair, then Taiwan suffix, then generic equity.
pub fn select_provider(symbol: &str) -> ProviderKind {
    let symbol = symbol.trim().to_uppercase();

    if symbol.contains("-USD") || symbol.contains("-BTC") || symbol.ends_with("USDT") {
        return ProviderKind::Crypto;
    }
    if symbol.ends_with(".TW") || symbol.ends_with(".TWO") {
        return ProviderKind::Regional;
    }
    ProviderKind::Equity
}
