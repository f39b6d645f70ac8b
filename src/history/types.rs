//! History types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// One admitted price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    /// Always strictly positive
    pub price: Decimal,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// Outcome of running a candidate through the cleaner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Candidate stored as the newest sample
    Admitted(Decimal),
    /// Candidate looked like a glitch; the last admitted price stands
    Rejected { candidate: Decimal, kept: Decimal },
}

impl Admission {
    /// Price the rest of the pipeline should use
    pub fn price(&self) -> Decimal {
        match self {
            Admission::Admitted(price) => *price,
            Admission::Rejected { kept, .. } => *kept,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected { .. })
    }
}
