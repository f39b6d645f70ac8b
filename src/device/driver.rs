//! Drives the indicator from the alert event stream

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{Indicator, IndicatorState};
use crate::alert::{AlertEvent, AlertKind};

/// Maps alert events to indicator states
///
/// Alert colors stay up for at least `hold`; routine events only return
/// the light to standby once that has elapsed.
pub struct IndicatorDriver {
    indicator: Arc<dyn Indicator>,
    hold: Duration,
    current: IndicatorState,
    since: Option<DateTime<Utc>>,
}

impl IndicatorDriver {
    pub fn new(indicator: Arc<dyn Indicator>, hold: std::time::Duration) -> Self {
        Self {
            indicator,
            hold: Duration::from_std(hold).unwrap_or_else(|_| Duration::seconds(60)),
            current: IndicatorState::Standby,
            since: None,
        }
    }

    pub fn current(&self) -> IndicatorState {
        self.current
    }

    /// State the event should move the indicator to, if it changes
    fn next_state(&self, event: &AlertEvent) -> Option<IndicatorState> {
        let next = match event.kind {
            AlertKind::StopLoss => IndicatorState::StopLoss,
            AlertKind::TargetHit => IndicatorState::Target,
            AlertKind::FlashCrash => IndicatorState::FlashCrash,
            AlertKind::Degraded => IndicatorState::Degraded,
            AlertKind::Recovered => IndicatorState::Standby,
            AlertKind::Routine => {
                let holding = self.current.is_alert()
                    && self.since.is_some_and(|since| event.at - since < self.hold);
                if holding || self.current == IndicatorState::Degraded {
                    return None;
                }
                IndicatorState::Standby
            }
        };
        (next != self.current).then_some(next)
    }

    /// Apply one event
    pub async fn handle(&mut self, event: &AlertEvent) {
        if let Some(next) = self.next_state(event) {
            tracing::debug!(from = ?self.current, to = ?next, kind = %event.kind, "Indicator change");
            self.indicator.apply(next).await;
            self.current = next;
            self.since = Some(event.at);
        } else if event.kind != AlertKind::Routine && self.current.is_alert() {
            // Repeated alert of the same kind restarts the hold
            self.since = Some(event.at);
        }
    }

    /// Consume events until the sender side is gone
    pub async fn run(mut self, mut events: broadcast::Receiver<AlertEvent>) {
        self.indicator.apply(self.current).await;
        loop {
            match events.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Indicator driver lagged behind events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Indicator driver stopped");
    }
}
