//! Flash-crash types

use rust_decimal::Decimal;
use serde::Serialize;

/// A confirmed flash crash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlashCrash {
    /// Oldest price inside the short window
    pub window_start_price: Decimal,

    /// Price that triggered the detection
    pub current_price: Decimal,

    /// Decline from the window start as a fraction (0.03 = 3%)
    pub drop_rate: Decimal,

    /// Standard score of the current price against retained history
    pub z_score: f64,

    /// Mean of the retained history
    pub mean: f64,

    /// Sample standard deviation of the retained history
    pub std_dev: f64,
}

impl FlashCrash {
    /// Drop rate in percent, rounded for display
    pub fn drop_pct(&self) -> Decimal {
        (self.drop_rate * Decimal::ONE_HUNDRED).round_dp(2)
    }
}
