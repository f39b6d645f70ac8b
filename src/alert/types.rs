//! Alert types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

/// Instrument and thresholds the alert path evaluates against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertConfig {
    pub symbol: String,
    pub target_price: Decimal,
    /// Zero disables the stop-loss check
    pub stop_loss_price: Decimal,
}

impl AlertConfig {
    pub fn new(symbol: impl Into<String>, target_price: Decimal, stop_loss_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            target_price,
            stop_loss_price,
        }
    }

    pub fn has_stop_loss(&self) -> bool {
        self.stop_loss_price > Decimal::ZERO
    }
}

/// Direction of interest, bound from the first clean price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMode {
    #[default]
    Undetermined,
    /// Price started below target; alert when it rises to it
    WaitingForRise,
    /// Price started at or above target; alert when it falls to it
    WaitingForFall,
}

impl AlertMode {
    /// Mode implied by a first price against the target
    pub fn bind(price: Decimal, target: Decimal) -> Self {
        if price < target {
            AlertMode::WaitingForRise
        } else {
            AlertMode::WaitingForFall
        }
    }

    pub fn is_hit(&self, price: Decimal, target: Decimal) -> bool {
        match self {
            AlertMode::WaitingForRise => price >= target,
            AlertMode::WaitingForFall => price <= target,
            AlertMode::Undetermined => false,
        }
    }
}

/// Outcome of evaluating one clean price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    StopLoss,
    TargetHit,
    /// Target reached but the shared cooldown has not elapsed
    CooldownSuppressed { remaining: Duration },
    Routine,
}

impl AlertDecision {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertDecision::StopLoss => AlertKind::StopLoss,
            AlertDecision::TargetHit => AlertKind::TargetHit,
            AlertDecision::CooldownSuppressed { .. } | AlertDecision::Routine => AlertKind::Routine,
        }
    }
}

/// Event kinds fanned out to collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    StopLoss,
    TargetHit,
    Routine,
    FlashCrash,
    Degraded,
    Recovered,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::StopLoss => "stop_loss",
            AlertKind::TargetHit => "target_hit",
            AlertKind::Routine => "routine",
            AlertKind::FlashCrash => "flash_crash",
            AlertKind::Degraded => "degraded",
            AlertKind::Recovered => "recovered",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emission on the alert bus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub symbol: String,
    pub price: Option<Decimal>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(
        kind: AlertKind,
        symbol: impl Into<String>,
        price: Option<Decimal>,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            price,
            message: message.into(),
            at,
        }
    }
}

/// Point-in-time view of the alert path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertState {
    pub mode: AlertMode,
    pub last_alert_at: Option<DateTime<Utc>>,
    pub alarm_active: bool,
}
