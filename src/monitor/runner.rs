//! The polling loop

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use super::shared::SharedConfig;
use super::status::{LogRing, MonitorStatus};
use crate::alert::{Alarm, AlertConfig, AlertDecision, AlertEvent, AlertKind, AlertStateMachine};
use crate::config::{AlertSettings, Config, ScheduleConfig};
use crate::crash::FlashCrash;
use crate::device::Narrator;
use crate::market::MarketDataAgent;
use crate::telemetry;

const EVENT_CAPACITY: usize = 256;
const LOG_CAPACITY: usize = 100;

/// What one tick saw and decided
#[derive(Debug, Clone)]
pub struct TickReport {
    pub market_open: bool,
    pub price: Option<Decimal>,
    pub decision: Option<AlertDecision>,
    /// Only set when a flash-crash event was emitted this tick
    pub flash_crash: Option<FlashCrash>,
    pub next_delay: Duration,
}

/// Mutable loop state, only touched between awaits
struct LoopState {
    /// Alert mode and cooldown clock
    machine: AlertStateMachine,

    /// Config seen on the previous tick, for change detection
    previous: Option<AlertConfig>,

    /// Consecutive open-market ticks without a price
    failures: u32,

    /// Set once a degraded event went out, cleared on recovery
    degraded: bool,

    /// When the last flash-crash event was emitted
    last_flash_crash_at: Option<DateTime<Utc>>,

    /// Snapshot served to the UI
    status: MonitorStatus,

    /// Recent log lines
    logs: LogRing,
}

/// Single long-lived scheduler driving the whole pipeline
///
/// Every collaborator (indicator, UI, logger) subscribes to the event
/// stream independently. Nothing in a tick can fail the loop: a missing
/// price is a missed tick.
pub struct Monitor {
    /// Price, history and market-hours source
    agent: Arc<MarketDataAgent>,

    /// Alert config, re-read at the top of every tick
    config: Arc<SharedConfig>,

    /// Speech output for alarms and flash crashes
    narrator: Arc<dyn Narrator>,

    /// Event fan-out to indicator, UI and logs
    events: broadcast::Sender<AlertEvent>,

    /// Repeating alarm started on stop-loss and target hits
    alarm: Alarm,

    /// Cooldown, alarm and suppression timing
    settings: AlertSettings,

    /// Tick cadence
    schedule: ScheduleConfig,

    /// Index refreshed on every tick, open or closed
    index_symbol: Option<String>,

    state: Mutex<LoopState>,
}

impl Monitor {
    pub fn new(
        agent: Arc<MarketDataAgent>,
        config: Arc<SharedConfig>,
        narrator: Arc<dyn Narrator>,
        app: &Config,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let index_symbol = app
            .monitor
            .market_index_symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            agent,
            config,
            narrator,
            events,
            alarm: Alarm::new(),
            settings: app.alert.clone(),
            schedule: app.schedule.clone(),
            index_symbol,
            state: Mutex::new(LoopState {
                machine: AlertStateMachine::new(Duration::from_secs(app.alert.cooldown_secs)),
                previous: None,
                failures: 0,
                degraded: false,
                last_flash_crash_at: None,
                status: MonitorStatus::default(),
                logs: LogRing::new(LOG_CAPACITY),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn agent(&self) -> &Arc<MarketDataAgent> {
        &self.agent
    }

    pub fn config(&self) -> &Arc<SharedConfig> {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Acknowledge the alarm; false when none was running
    pub fn stop_alarm(&self) -> bool {
        let stopped = self.alarm.stop();
        if stopped {
            self.log(Utc::now(), "Alarm stopped by user");
        }
        stopped
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.state();
        let mut status = state.status.clone();
        status.alert_mode = state.machine.mode();
        status.alarm_active = self.alarm.is_active();
        status.degraded = state.degraded;
        status.consecutive_failures = state.failures;
        status
    }

    pub fn recent_logs(&self) -> Vec<String> {
        self.state().logs.lines()
    }

    fn log(&self, at: DateTime<Utc>, message: &str) {
        self.state().logs.push(at, message);
    }

    /// Run ticks until `shutdown` flips to true or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(symbol = %self.config.snapshot().symbol, "Monitor started");
        loop {
            let stop = *shutdown.borrow();
            if stop {
                break;
            }
            let report = self.tick(Utc::now()).await;
            tokio::select! {
                _ = tokio::time::sleep(report.next_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.alarm.stop();
        tracing::info!("Monitor stopped");
    }

    /// One scheduling iteration
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let config = self.config.snapshot();
        self.apply_config_change(&config, now);
        self.refresh_index().await;

        let market_open = self.agent.is_market_open_at(&config.symbol, now);
        if !market_open {
            let mut state = self.state();
            state.status.market_open = false;
            state.status.updated_at = Some(now);
            return TickReport {
                market_open,
                price: None,
                decision: None,
                flash_crash: None,
                next_delay: self.schedule.next_delay(false),
            };
        }

        let snapshot = self.agent.get_market_data_at(&config.symbol, now).await;
        {
            let mut state = self.state();
            state.status.name = snapshot.name.clone();
            state.status.provider = snapshot.provider;
            state.status.market_open = snapshot.is_open;
            state.status.updated_at = Some(now);
            if snapshot.price.is_some() {
                state.status.price = snapshot.price;
            }
        }
        if let (Some(candidate), Some(kept)) = (snapshot.outlier_rejected, snapshot.price) {
            self.log(now, &format!("Outlier filtered: {} (kept {})", candidate, kept));
        }

        let mut report = TickReport {
            market_open,
            price: snapshot.price,
            decision: None,
            flash_crash: None,
            next_delay: self.schedule.next_delay(true),
        };

        let Some(price) = snapshot.price else {
            self.record_failure(&config, now);
            return report;
        };
        self.record_success(&config, price, now);

        report.flash_crash = self.check_flash_crash(&config, price, now);

        let decision = self.state().machine.evaluate(&config, price, now);
        self.dispatch(&config, decision, price, now);
        report.decision = Some(decision);
        report
    }

    /// Reset the bound mode and histories when symbol or target changed
    fn apply_config_change(&self, config: &AlertConfig, now: DateTime<Utc>) {
        let mut state = self.state();
        state.status.symbol = config.symbol.clone();
        state.status.target_price = config.target_price;
        state.status.stop_loss_price = config.stop_loss_price;

        let Some(previous) = state.previous.replace(config.clone()) else {
            return;
        };
        if previous.symbol == config.symbol && previous.target_price == config.target_price {
            return;
        }

        state.machine.reset();
        state.last_flash_crash_at = None;
        if previous.symbol != config.symbol {
            state.status.name.clear();
            state.status.price = None;
        }
        self.agent.history().clear(&previous.symbol);
        self.agent.history().clear(&config.symbol);

        let message = format!(
            "Config changed: {} @ {} -> {} @ {}",
            previous.symbol, previous.target_price, config.symbol, config.target_price
        );
        tracing::info!(%message, "Alert mode reset");
        state.logs.push(now, &message);
    }

    async fn refresh_index(&self) {
        let Some(symbol) = self.index_symbol.as_deref() else {
            return;
        };
        if let Some(quote) = self.agent.index_quote(symbol).await {
            self.state().status.index = Some(quote);
        }
    }

    fn record_failure(&self, config: &AlertConfig, now: DateTime<Utc>) {
        let newly_degraded = {
            let mut state = self.state();
            state.failures += 1;
            let reached = state.failures >= self.settings.degraded_after_failures;
            let newly = reached && !state.degraded;
            if newly {
                state.degraded = true;
            }
            tracing::warn!(symbol = %config.symbol, failures = state.failures, "No price this tick");
            newly
        };

        if newly_degraded {
            let message = format!(
                "No data for {} after {} attempts",
                config.symbol, self.settings.degraded_after_failures
            );
            self.emit(AlertKind::Degraded, &config.symbol, None, message, now);
        }
    }

    fn record_success(&self, config: &AlertConfig, price: Decimal, now: DateTime<Utc>) {
        let recovered = {
            let mut state = self.state();
            state.failures = 0;
            std::mem::replace(&mut state.degraded, false)
        };
        if recovered {
            let message = format!("Data for {} restored at {}", config.symbol, price);
            self.emit(AlertKind::Recovered, &config.symbol, Some(price), message, now);
        }
    }

    fn check_flash_crash(
        &self,
        config: &AlertConfig,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Option<FlashCrash> {
        let crash = self.agent.flash_crash_at(&config.symbol, price, now)?;

        {
            let mut state = self.state();
            let quiet = crate::config::span(self.settings.flash_crash_suppression_secs);
            if state.last_flash_crash_at.is_some_and(|at| now - at < quiet) {
                tracing::debug!(symbol = %config.symbol, drop_rate = %crash.drop_rate, "Flash crash suppressed");
                return None;
            }
            state.last_flash_crash_at = Some(now);
        }

        let message = format!(
            "Flash crash: {} down {}% within a minute, now {} (z {:.2})",
            config.symbol,
            crash.drop_pct(),
            price,
            crash.z_score
        );
        self.emit(AlertKind::FlashCrash, &config.symbol, Some(price), message.clone(), now);
        self.narrate(message);
        Some(crash)
    }

    fn dispatch(
        &self,
        config: &AlertConfig,
        decision: AlertDecision,
        price: Decimal,
        now: DateTime<Utc>,
    ) {
        let symbol = &config.symbol;
        match decision {
            AlertDecision::StopLoss => {
                let message = format!(
                    "Stop-loss: {} at {}, at or below {}",
                    symbol, price, config.stop_loss_price
                );
                self.emit(AlertKind::StopLoss, symbol, Some(price), message.clone(), now);
                self.narrate(message);
            }
            AlertDecision::TargetHit => {
                let message = format!(
                    "Target reached: {} at {} (target {})",
                    symbol, price, config.target_price
                );
                self.emit(AlertKind::TargetHit, symbol, Some(price), message.clone(), now);
                let interval = Duration::from_secs(self.settings.alarm_repeat_secs);
                if !self.alarm.start(Arc::clone(&self.narrator), message, interval) {
                    tracing::debug!(%symbol, "Alarm already active");
                }
            }
            AlertDecision::CooldownSuppressed { remaining } => {
                let message = format!(
                    "{} at {}, target reached but cooling down ({}s left)",
                    symbol,
                    price,
                    remaining.as_secs()
                );
                self.emit(AlertKind::Routine, symbol, Some(price), message, now);
            }
            AlertDecision::Routine => {
                let message = format!("{} at {}, watching for {}", symbol, price, config.target_price);
                self.emit(AlertKind::Routine, symbol, Some(price), message, now);
            }
        }
    }

    fn narrate(&self, message: String) {
        let narrator = Arc::clone(&self.narrator);
        tokio::spawn(async move {
            narrator.speak(&message).await;
        });
    }

    fn emit(
        &self,
        kind: AlertKind,
        symbol: &str,
        price: Option<Decimal>,
        message: String,
        at: DateTime<Utc>,
    ) {
        match kind {
            AlertKind::Routine => tracing::debug!(%symbol, %message, "Routine tick"),
            AlertKind::Degraded => tracing::warn!(%symbol, %message, "Degraded"),
            _ => {
                telemetry::record_alert(kind);
                tracing::info!(%symbol, kind = %kind, %message, "Alert");
            }
        }
        self.log(at, &message);
        // No subscribers is not an error
        let _ = self.events.send(AlertEvent::new(kind, symbol, price, message, at));
    }
}
