//! Runtime-editable alert configuration

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use crate::alert::AlertConfig;
use crate::config::MonitorConfig;
use crate::error::ConfigError;

/// Raw field values as typed by a user; `None` leaves a field alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertConfigUpdate {
    pub symbol: Option<String>,
    pub target_price: Option<String>,
    pub stop_loss_price: Option<String>,
}

/// Symbol and thresholds shared between the loop and whoever edits them
#[derive(Debug)]
pub struct SharedConfig {
    inner: RwLock<AlertConfig>,
}

impl SharedConfig {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    pub fn from_monitor_config(config: &MonitorConfig) -> Self {
        Self::new(AlertConfig::new(
            normalize_symbol(&config.symbol).unwrap_or_else(|_| config.symbol.clone()),
            config.target_price,
            config.stop_loss_price,
        ))
    }

    pub fn snapshot(&self) -> AlertConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply every valid field; invalid ones are logged and skipped
    pub fn update(&self, update: AlertConfigUpdate) -> AlertConfig {
        let mut config = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(raw) = update.symbol {
            match normalize_symbol(&raw) {
                Ok(symbol) => config.symbol = symbol,
                Err(e) => tracing::warn!(error = %e, "Ignoring symbol update"),
            }
        }
        if let Some(raw) = update.target_price {
            match parse_price("target_price", &raw, false) {
                Ok(price) => config.target_price = price,
                Err(e) => tracing::warn!(error = %e, "Ignoring target update"),
            }
        }
        if let Some(raw) = update.stop_loss_price {
            match parse_price("stop_loss_price", &raw, true) {
                Ok(price) => config.stop_loss_price = price,
                Err(e) => tracing::warn!(error = %e, "Ignoring stop-loss update"),
            }
        }

        tracing::info!(
            symbol = %config.symbol,
            target = %config.target_price,
            stop_loss = %config.stop_loss_price,
            "Alert config updated"
        );
        config.clone()
    }
}

/// Trimmed, upper-cased symbol
pub fn normalize_symbol(raw: &str) -> Result<String, ConfigError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(ConfigError::EmptySymbol);
    }
    Ok(symbol)
}

/// Parse a decimal price; zero is only accepted when `allow_zero`
pub fn parse_price(field: &'static str, raw: &str, allow_zero: bool) -> Result<Decimal, ConfigError> {
    let trimmed = raw.trim();
    let price = Decimal::from_str(trimmed).map_err(|_| ConfigError::InvalidNumber {
        field,
        value: trimmed.to_string(),
    })?;

    let in_range = if allow_zero {
        price >= Decimal::ZERO
    } else {
        price > Decimal::ZERO
    };
    if !in_range {
        return Err(ConfigError::OutOfRange {
            field,
            value: price.to_string(),
        });
    }
    Ok(price)
}
