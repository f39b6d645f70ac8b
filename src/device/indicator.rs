//! Indicator actuator seam

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// What the light should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    #[default]
    Standby,
    Target,
    StopLoss,
    FlashCrash,
    Degraded,
}

impl IndicatorState {
    pub fn color(&self) -> &'static str {
        match self {
            IndicatorState::Standby => "yellow",
            IndicatorState::Target => "green",
            IndicatorState::StopLoss => "red",
            IndicatorState::FlashCrash => "purple",
            IndicatorState::Degraded => "error",
        }
    }

    /// Alert colors are held before falling back to standby
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            IndicatorState::Target | IndicatorState::StopLoss | IndicatorState::FlashCrash
        )
    }
}

/// Physical light or outlet
#[async_trait]
pub trait Indicator: Send + Sync {
    async fn apply(&self, state: IndicatorState);
}

/// Logs state changes instead of driving hardware
#[derive(Debug, Default)]
pub struct LogIndicator;

#[async_trait]
impl Indicator for LogIndicator {
    async fn apply(&self, state: IndicatorState) {
        tracing::info!(?state, color = state.color(), "Indicator");
    }
}

/// Keeps every applied state in memory
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    applied: Mutex<Vec<IndicatorState>>,
}

impl RecordingIndicator {
    pub fn applied(&self) -> Vec<IndicatorState> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Indicator for RecordingIndicator {
    async fn apply(&self, state: IndicatorState) {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state);
    }
}
