//! Direction binding, threshold evaluation and cooldown

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

use super::types::{AlertConfig, AlertDecision, AlertMode};

/// Alert mode plus the shared cooldown clock
///
/// Stop-loss bypasses the cooldown but still restarts it, so a target hit
/// right after a stop-loss is suppressed.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    cooldown: Duration,
    mode: AlertMode,
    last_alert_at: Option<DateTime<Utc>>,
}

impl AlertStateMachine {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            mode: AlertMode::Undetermined,
            last_alert_at: None,
        }
    }

    pub fn mode(&self) -> AlertMode {
        self.mode
    }

    pub fn last_alert_at(&self) -> Option<DateTime<Utc>> {
        self.last_alert_at
    }

    /// Forget the bound direction; the cooldown clock is kept
    pub fn reset(&mut self) {
        self.mode = AlertMode::Undetermined;
    }

    pub fn evaluate(
        &mut self,
        config: &AlertConfig,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> AlertDecision {
        if self.mode == AlertMode::Undetermined {
            self.mode = AlertMode::bind(price, config.target_price);
            tracing::info!(
                symbol = %config.symbol,
                %price,
                target = %config.target_price,
                mode = ?self.mode,
                "Alert mode bound"
            );
        }

        if config.has_stop_loss() && price <= config.stop_loss_price {
            self.last_alert_at = Some(now);
            return AlertDecision::StopLoss;
        }

        if !self.mode.is_hit(price, config.target_price) {
            return AlertDecision::Routine;
        }

        if let Some(remaining) = self.cooldown_remaining(now) {
            return AlertDecision::CooldownSuppressed { remaining };
        }

        self.last_alert_at = Some(now);
        AlertDecision::TargetHit
    }

    fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let elapsed = (now - self.last_alert_at?).to_std().unwrap_or_default();
        self.cooldown.checked_sub(elapsed).filter(|r| !r.is_zero())
    }
}
