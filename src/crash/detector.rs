//! Two-stage crash detector: window drop, then z-score confirmation

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::types::FlashCrash;
use crate::config::{self, FlashCrashConfig};
use crate::history::PriceSample;

/// Stateless flash-crash query over a slice of samples
///
/// The caller passes the retained history (oldest first) with the current
/// price already admitted. Detection needs `min_samples` in history and
/// `min_window_samples` inside the short window, a window decline of at
/// least `drop_threshold`, and a z-score below `z_threshold`.
#[derive(Debug, Clone)]
pub struct FlashCrashDetector {
    config: FlashCrashConfig,
}

impl FlashCrashDetector {
    pub fn new(config: FlashCrashConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FlashCrashConfig::default())
    }

    pub fn config(&self) -> &FlashCrashConfig {
        &self.config
    }

    /// Oldest sample price inside the short window
    ///
    /// `None` when the window holds too few samples.
    fn window_start(&self, history: &[PriceSample], now: DateTime<Utc>) -> Option<Decimal> {
        let window = config::span(self.config.window_secs);
        let mut in_window = history.iter().filter(|s| now - s.timestamp <= window);

        let start = in_window.next()?.price;
        if 1 + in_window.count() < self.config.min_window_samples || start <= Decimal::ZERO {
            return None;
        }
        Some(start)
    }

    /// Decline from the oldest in-window sample to `current`
    pub fn window_drop_rate(
        &self,
        history: &[PriceSample],
        current: Decimal,
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        let start = self.window_start(history, now)?;
        (start - current).checked_div(start)
    }

    pub fn detect(
        &self,
        history: &[PriceSample],
        current: Decimal,
        now: DateTime<Utc>,
    ) -> Option<FlashCrash> {
        if history.len() < self.config.min_samples || history.len() < 2 {
            return None;
        }

        let window_start_price = self.window_start(history, now)?;
        let drop_rate = self.window_drop_rate(history, current, now)?;
        if drop_rate < self.config.drop_threshold {
            return None;
        }

        let prices: Vec<f64> = history.iter().filter_map(|s| s.price.to_f64()).collect();
        let (mean, std_dev) = mean_and_std(&prices)?;
        if std_dev <= 0.0 {
            return None;
        }

        let z_score = (current.to_f64()? - mean) / std_dev;
        if z_score >= self.config.z_threshold {
            tracing::debug!(%drop_rate, z_score, "Window drop not confirmed");
            return None;
        }

        Some(FlashCrash {
            window_start_price,
            current_price: current,
            drop_rate,
            z_score,
            mean,
            std_dev,
        })
    }
}

/// Mean and sample standard deviation (n - 1)
fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn sample(now: DateTime<Utc>, age_secs: i64, price: Decimal) -> PriceSample {
        PriceSample::new(now - Duration::seconds(age_secs), price)
    }

    /// Seven flat samples, a slide inside the last minute, then 97
    fn crash_history(now: DateTime<Utc>) -> Vec<PriceSample> {
        let mut history: Vec<PriceSample> = [280, 240, 200, 160, 120, 90, 60]
            .into_iter()
            .map(|age| sample(now, age, dec!(100)))
            .collect();
        history.push(sample(now, 30, dec!(99.5)));
        history.push(sample(now, 15, dec!(99.0)));
        history.push(sample(now, 0, dec!(97)));
        history
    }

    #[test]
    fn test_confirmed_crash() {
        let now = Utc::now();
        let detector = FlashCrashDetector::with_defaults();

        let crash = detector.detect(&crash_history(now), dec!(97), now).unwrap();
        assert_eq!(crash.drop_rate, dec!(0.03));
        assert_eq!(crash.drop_pct(), dec!(3.00));
        assert!(crash.z_score < -2.0);
        assert!((crash.mean - 99.55).abs() < 1e-9);
        assert_eq!(crash.window_start_price, dec!(100));
    }

    #[test]
    fn test_short_history_not_confirmed() {
        let now = Utc::now();
        let history = vec![
            sample(now, 45, dec!(100)),
            sample(now, 30, dec!(100)),
            sample(now, 15, dec!(99.5)),
            sample(now, 5, dec!(99.0)),
            sample(now, 0, dec!(97)),
        ];
        let detector = FlashCrashDetector::with_defaults();

        // Window drop passes, the z-score (about -1.69) does not
        let drop = detector.window_drop_rate(&history, dec!(97), now).unwrap();
        assert!(drop >= dec!(0.015));
        assert!(detector.detect(&history, dec!(97), now).is_none());
    }

    #[test]
    fn test_too_few_samples() {
        let now = Utc::now();
        let history = vec![
            sample(now, 30, dec!(100)),
            sample(now, 15, dec!(100)),
            sample(now, 0, dec!(90)),
        ];
        assert!(FlashCrashDetector::with_defaults()
            .detect(&history, dec!(90), now)
            .is_none());
    }

    #[test]
    fn test_small_drop_ignored() {
        let now = Utc::now();
        let mut history = crash_history(now);
        history.pop();
        history.push(sample(now, 0, dec!(99.0)));
        assert!(FlashCrashDetector::with_defaults()
            .detect(&history, dec!(99.0), now)
            .is_none());
    }

    #[test]
    fn test_sparse_window_ignored() {
        let now = Utc::now();
        let history: Vec<PriceSample> = [290, 250, 210, 170, 130, 90]
            .into_iter()
            .map(|age| sample(now, age, dec!(100)))
            .chain([sample(now, 20, dec!(99)), sample(now, 0, dec!(90))])
            .collect();
        let detector = FlashCrashDetector::with_defaults();
        assert!(detector.window_drop_rate(&history, dec!(90), now).is_none());
        assert!(detector.detect(&history, dec!(90), now).is_none());
    }

    #[test]
    fn test_flat_history_has_no_spread() {
        let now = Utc::now();
        let history: Vec<PriceSample> = (0..10).map(|i| sample(now, i * 5, dec!(50))).collect();
        assert!(FlashCrashDetector::with_defaults()
            .detect(&history, dec!(50), now)
            .is_none());
    }

    #[test]
    fn test_rise_is_not_crash() {
        let now = Utc::now();
        let mut history = crash_history(now);
        history.pop();
        history.push(sample(now, 0, dec!(104)));
        assert!(FlashCrashDetector::with_defaults()
            .detect(&history, dec!(104), now)
            .is_none());
    }

    #[test]
    fn test_extreme_prices_do_not_overflow() {
        let now = Utc::now();
        let history: Vec<PriceSample> = [50, 40, 30, 20, 10]
            .into_iter()
            .map(|age| sample(now, age, dec!(0.000001)))
            .chain([sample(now, 0, Decimal::MAX)])
            .collect();
        let detector = FlashCrashDetector::new(FlashCrashConfig {
            min_samples: 2,
            ..FlashCrashConfig::default()
        });
        assert!(detector.window_drop_rate(&history, Decimal::MAX, now).is_none());
        assert!(detector.detect(&history, Decimal::MAX, now).is_none());
    }

    #[test]
    fn test_mean_and_std() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.138089935).abs() < 1e-6);
        assert!(mean_and_std(&[1.0]).is_none());
    }
}
