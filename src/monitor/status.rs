//! Status snapshot and recent-log ring for UI polling

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;

use crate::alert::AlertMode;
use crate::market::IndexQuote;

/// Everything a status page shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub symbol: String,
    pub name: String,
    pub price: Option<Decimal>,
    pub target_price: Decimal,
    pub stop_loss_price: Decimal,
    pub market_open: bool,
    pub provider: &'static str,
    pub index: Option<IndexQuote>,
    pub updated_at: Option<DateTime<Utc>>,
    pub alert_mode: AlertMode,
    pub alarm_active: bool,
    pub degraded: bool,
    pub consecutive_failures: u32,
}

/// Bounded list of human-readable log lines, newest last
#[derive(Debug, Clone)]
pub struct LogRing {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, at: DateTime<Utc>, message: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines
            .push_back(format!("[{}] {}", at.format("%H:%M:%S"), message));
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
