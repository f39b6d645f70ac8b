//! Error types shared across the pipeline

use thiserror::Error;

/// Failure of a market-data provider call
///
/// Every provider operation returns this instead of panicking. The agent
/// turns it into a missing price, so it never reaches the polling loop.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network, HTTP status or payload parse failure
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The source answered but had no usable price
    #[error("no data for {0}")]
    NoData(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Unavailable(e.to_string())
    }
}

/// Rejected runtime configuration input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is not a number
    #[error("{field}: '{value}' is not a number")]
    InvalidNumber { field: &'static str, value: String },
    /// Value parsed but is outside the allowed range
    #[error("{field}: {value} is out of range")]
    OutOfRange { field: &'static str, value: String },
    /// Symbol was blank after trimming
    #[error("symbol must not be empty")]
    EmptySymbol,
}
