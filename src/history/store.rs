//! Clean-and-admit sample store

use super::{Admission, PriceSample};
use crate::config::{self, CleanerConfig};
use crate::crash::{FlashCrash, FlashCrashDetector};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Price samples for every watched symbol behind one lock
///
/// Streaming and polling paths may admit concurrently; every
/// read-modify-write happens under the lock and never across an await.
pub struct SampleHistory {
    config: CleanerConfig,
    filter_outliers: bool,
    samples: Mutex<HashMap<String, VecDeque<PriceSample>>>,
}

impl SampleHistory {
    pub fn new(config: CleanerConfig) -> Self {
        Self {
            config,
            filter_outliers: true,
            samples: Mutex::new(HashMap::new()),
        }
    }

    /// Admit every positive candidate verbatim (simulation mode)
    pub fn without_outlier_filter(mut self) -> Self {
        self.filter_outliers = false;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<PriceSample>>> {
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a candidate price through the outlier filter
    ///
    /// A move larger than `max_jump_ratio` against the last admitted price is
    /// only accepted when it is also that large against the price before it.
    /// Returns `None` for non-positive candidates, which are never stored.
    pub fn clean_and_admit(
        &self,
        symbol: &str,
        candidate: Decimal,
        now: DateTime<Utc>,
    ) -> Option<Admission> {
        if candidate <= Decimal::ZERO {
            return None;
        }

        let mut all = self.lock();
        let history = all.entry(symbol.to_string()).or_default();

        if let Some(last) = history.back().map(|s| s.price) {
            if self.filter_outliers && self.is_jump(candidate, last) {
                let confirmed = history.len() >= 2
                    && self.is_jump(candidate, history[history.len() - 2].price);
                if !confirmed {
                    tracing::info!(%symbol, %last, %candidate, "Outlier filtered");
                    return Some(Admission::Rejected {
                        candidate,
                        kept: last,
                    });
                }
                tracing::info!(%symbol, %last, %candidate, "Large move confirmed");
            }
        }

        history.push_back(PriceSample::new(now, candidate));
        while history.len() > self.config.capacity {
            history.pop_front();
        }

        Some(Admission::Admitted(candidate))
    }

    /// A ratio too large for `Decimal` counts as a jump
    fn is_jump(&self, candidate: Decimal, reference: Decimal) -> bool {
        (candidate - reference)
            .abs()
            .checked_div(reference)
            .map_or(true, |ratio| ratio > self.config.max_jump_ratio)
    }

    /// All stored samples, oldest first
    pub fn samples(&self, symbol: &str) -> Vec<PriceSample> {
        self.lock()
            .get(symbol)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Samples no older than the retention window
    pub fn recent(&self, symbol: &str, now: DateTime<Utc>) -> Vec<PriceSample> {
        let cutoff = now - self.retention();
        self.lock()
            .get(symbol)
            .map(|h| h.iter().filter(|s| s.timestamp >= cutoff).copied().collect())
            .unwrap_or_default()
    }

    /// Most recently admitted price
    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.lock().get(symbol)?.back().map(|s| s.price)
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.lock().get(symbol).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }

    /// Drop a symbol's history
    pub fn clear(&self, symbol: &str) {
        if self.lock().remove(symbol).is_some() {
            tracing::debug!(%symbol, "History cleared");
        }
    }

    /// Run the crash detector over the retained window
    pub fn detect_flash_crash(
        &self,
        symbol: &str,
        current: Decimal,
        now: DateTime<Utc>,
        detector: &FlashCrashDetector,
    ) -> Option<FlashCrash> {
        let recent = self.recent(symbol, now);
        detector.detect(&recent, current, now)
    }

    fn retention(&self) -> Duration {
        config::span(self.config.retention_secs)
    }
}
