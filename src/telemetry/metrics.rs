//! Prometheus metrics

use crate::alert::AlertKind;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::time::Duration;

/// Record how long a provider took to answer a price request
pub fn record_fetch_latency(provider: &'static str, duration: Duration) {
    metrics::histogram!("stocklight_fetch_latency_ms", "provider" => provider)
        .record(duration.as_secs_f64() * 1000.0);
}

/// Count a failed provider call
pub fn record_provider_failure(provider: &'static str) {
    metrics::counter!("stocklight_provider_failures_total", "provider" => provider).increment(1);
}

/// Count a sample dropped by the outlier filter
pub fn record_outlier_rejected() {
    metrics::counter!("stocklight_outliers_rejected_total").increment(1);
}

/// Count an emitted alert event
pub fn record_alert(kind: AlertKind) {
    metrics::counter!("stocklight_alerts_total", "kind" => kind.as_str()).increment(1);
}

/// Publish the last admitted price
pub fn set_last_price(price: Decimal) {
    metrics::gauge!("stocklight_last_price").set(price.to_f64().unwrap_or(0.0));
}
