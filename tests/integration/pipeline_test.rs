//! End-to-end monitor ticks over mock prices

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use stocklight::alert::{AlertConfig, AlertDecision, AlertEvent, AlertKind, AlertMode};
use stocklight::config::Config;
use stocklight::device::{IndicatorDriver, IndicatorState, RecordingIndicator, RecordingNarrator};
use stocklight::market::MarketDataAgent;
use stocklight::monitor::{AlertConfigUpdate, Monitor, SharedConfig};
use tokio::sync::broadcast;

const SYMBOL: &str = "2330.TW";

struct Harness {
    monitor: Monitor,
    events: broadcast::Receiver<AlertEvent>,
    t0: DateTime<Utc>,
}

impl Harness {
    fn new(target: Decimal, stop_loss: Decimal) -> Self {
        let mut config = Config::default();
        config.monitor.market_index_symbol = None;

        let agent = Arc::new(MarketDataAgent::new(&config).unwrap());
        let shared = Arc::new(SharedConfig::new(AlertConfig::new(SYMBOL, target, stop_loss)));
        let monitor = Monitor::new(agent, shared, Arc::new(RecordingNarrator::default()), &config);
        let events = monitor.subscribe();
        Self {
            monitor,
            events,
            t0: Utc::now(),
        }
    }

    async fn tick(&self, secs: i64, price: Decimal) -> stocklight::monitor::TickReport {
        self.tick_symbol(SYMBOL, secs, price).await
    }

    async fn tick_symbol(
        &self,
        symbol: &str,
        secs: i64,
        price: Decimal,
    ) -> stocklight::monitor::TickReport {
        self.monitor.agent().set_mock_price(symbol, Some(price));
        self.monitor.tick(self.t0 + Duration::seconds(secs)).await
    }

    fn drain(&mut self) -> Vec<AlertKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }
}

#[tokio::test]
async fn test_mode_binding_and_target_hit() {
    let mut h = Harness::new(dec!(900), Decimal::ZERO);

    h.tick(0, dec!(890)).await;
    assert_eq!(h.monitor.status().alert_mode, AlertMode::WaitingForRise);

    let report = h.tick(10, dec!(910)).await;
    assert_eq!(report.decision, Some(AlertDecision::TargetHit));

    let report = h.tick(20, dec!(890)).await;
    assert_eq!(report.decision, Some(AlertDecision::Routine));

    assert_eq!(
        h.drain(),
        vec![AlertKind::Routine, AlertKind::TargetHit, AlertKind::Routine]
    );
    assert!(h.monitor.stop_alarm());
}

#[tokio::test]
async fn test_second_hit_inside_cooldown_is_routine() {
    let mut h = Harness::new(dec!(900), Decimal::ZERO);

    h.tick(0, dec!(890)).await;
    h.tick(10, dec!(910)).await;
    h.tick(20, dec!(890)).await;
    let report = h.tick(100, dec!(920)).await;
    assert!(matches!(
        report.decision,
        Some(AlertDecision::CooldownSuppressed { .. })
    ));

    let kinds = h.drain();
    assert_eq!(kinds.iter().filter(|k| **k == AlertKind::TargetHit).count(), 1);

    let report = h.tick(400, dec!(925)).await;
    assert_eq!(report.decision, Some(AlertDecision::TargetHit));
    h.monitor.stop_alarm();
}

#[tokio::test]
async fn test_stop_loss_beats_target_direction() {
    let mut h = Harness::new(dec!(900), dec!(800));

    h.tick(0, dec!(850)).await;
    let report = h.tick(10, dec!(790)).await;
    assert_eq!(report.decision, Some(AlertDecision::StopLoss));
    assert!(!h.monitor.status().alarm_active);
    assert_eq!(h.drain(), vec![AlertKind::Routine, AlertKind::StopLoss]);
}

#[tokio::test]
async fn test_symbol_change_resets_mode_and_history() {
    let h = Harness::new(dec!(900), Decimal::ZERO);
    for i in 0..3 {
        h.tick(i * 10, dec!(890)).await;
    }
    let history = h.monitor.agent().history();
    assert_eq!(history.len(SYMBOL), 3);

    h.monitor.config().update(AlertConfigUpdate {
        symbol: Some("aapl".into()),
        ..Default::default()
    });
    // No usable price yet for the new symbol
    h.tick_symbol("AAPL", 40, Decimal::ZERO).await;

    let status = h.monitor.status();
    assert_eq!(status.symbol, "AAPL");
    assert_eq!(status.alert_mode, AlertMode::Undetermined);
    assert!(history.is_empty(SYMBOL));
    assert!(history.is_empty("AAPL"));

    h.tick_symbol("AAPL", 50, dec!(950)).await;
    assert_eq!(h.monitor.status().alert_mode, AlertMode::WaitingForFall);
}

#[tokio::test]
async fn test_target_change_rebinds_mode() {
    let h = Harness::new(dec!(900), Decimal::ZERO);
    h.tick(0, dec!(890)).await;
    assert_eq!(h.monitor.status().alert_mode, AlertMode::WaitingForRise);

    h.monitor.config().update(AlertConfigUpdate {
        target_price: Some("850".into()),
        ..Default::default()
    });
    h.tick(10, dec!(890)).await;
    assert_eq!(h.monitor.status().alert_mode, AlertMode::WaitingForFall);
    assert_eq!(h.monitor.agent().history().len(SYMBOL), 1);
}

#[tokio::test]
async fn test_flash_crash_fires_once_per_quiet_period() {
    let mut h = Harness::new(dec!(50), Decimal::ZERO);
    let slide = [
        (0, dec!(100)),
        (40, dec!(100)),
        (80, dec!(100)),
        (120, dec!(100)),
        (160, dec!(100)),
        (190, dec!(100)),
        (220, dec!(100)),
        (250, dec!(99.5)),
        (265, dec!(99.0)),
    ];
    for (secs, price) in slide {
        let report = h.tick(secs, price).await;
        assert!(report.flash_crash.is_none());
    }

    let report = h.tick(280, dec!(97)).await;
    let crash = report.flash_crash.expect("crash should be confirmed");
    assert_eq!(crash.drop_rate, dec!(0.03));
    assert!(crash.z_score < -2.0);
    assert_eq!(
        h.monitor.agent().detect_flash_crash_at(SYMBOL, dec!(97), h.t0 + Duration::seconds(280)),
        Some(dec!(0.03))
    );

    let report = h.tick(290, dec!(96)).await;
    assert!(report.flash_crash.is_none());

    let crashes = h
        .drain()
        .into_iter()
        .filter(|k| *k == AlertKind::FlashCrash)
        .count();
    assert_eq!(crashes, 1);
}

#[tokio::test]
async fn test_outlier_glitch_does_not_alert() {
    let mut h = Harness::new(dec!(150), Decimal::ZERO);
    h.tick(0, dec!(100)).await;

    let report = h.tick(10, dec!(200)).await;
    assert_eq!(report.price, Some(dec!(100)));
    assert_eq!(report.decision, Some(AlertDecision::Routine));
    assert!(h.drain().iter().all(|k| *k == AlertKind::Routine));
    assert!(h
        .monitor
        .recent_logs()
        .iter()
        .any(|line| line.contains("Outlier filtered: 200")));
}

#[tokio::test]
async fn test_closed_market_skips_fetch() {
    let mut config = Config::default();
    config.monitor.market_index_symbol = None;
    let agent = Arc::new(MarketDataAgent::new(&config).unwrap());
    let shared = Arc::new(SharedConfig::new(AlertConfig::new("AAPL", dec!(200), dec!(0))));
    let monitor = Monitor::new(agent, shared, Arc::new(RecordingNarrator::default()), &config);

    // Saturday
    let report = monitor.tick("2024-06-08T15:00:00Z".parse().unwrap()).await;
    assert!(!report.market_open);
    assert!(report.price.is_none());
    assert_eq!(report.next_delay, std::time::Duration::from_secs(60));
    assert!(!monitor.status().degraded);
}

#[tokio::test]
async fn test_indicator_follows_events() {
    let h = Harness::new(dec!(900), dec!(800));
    let indicator = Arc::new(RecordingIndicator::default());
    let driver = IndicatorDriver::new(indicator.clone(), std::time::Duration::from_secs(60));
    let driver_task = tokio::spawn(driver.run(h.monitor.subscribe()));

    h.tick(0, dec!(850)).await;
    h.tick(10, dec!(905)).await;
    h.tick(20, dec!(790)).await;
    h.tick(100, dec!(850)).await;
    h.monitor.stop_alarm();

    let Harness { monitor, events, .. } = h;
    drop(events);
    drop(monitor);
    driver_task.await.unwrap();

    assert_eq!(
        indicator.applied(),
        vec![
            IndicatorState::Standby,
            IndicatorState::Target,
            IndicatorState::StopLoss,
            IndicatorState::Standby,
        ]
    );
}

#[tokio::test]
async fn test_stored_prices_stay_positive() {
    let h = Harness::new(dec!(1000), Decimal::ZERO);
    let feed = [dec!(100), dec!(0), dec!(200), dec!(-4), dec!(101), dec!(99)];
    for (i, price) in feed.into_iter().enumerate() {
        h.tick(i as i64 * 10, price).await;
    }
    let samples = h.monitor.agent().history().samples(SYMBOL);
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.price > Decimal::ZERO));
}

#[tokio::test]
async fn test_extreme_simulated_prices_keep_loop_alive() {
    let mut config = Config::default();
    config.monitor.market_index_symbol = None;
    config.schedule.simulation = true;
    let agent = Arc::new(MarketDataAgent::new(&config).unwrap());
    let shared = Arc::new(SharedConfig::new(AlertConfig::new(SYMBOL, dec!(200), dec!(0))));
    let monitor = Monitor::new(agent, shared, Arc::new(RecordingNarrator::default()), &config);
    let t0 = Utc::now();

    for (i, price) in [dec!(0.000001), dec!(0.000001), dec!(0.000001), Decimal::MAX]
        .into_iter()
        .enumerate()
    {
        monitor.agent().set_mock_price(SYMBOL, Some(price));
        let report = monitor.tick(t0 + Duration::seconds(i as i64 * 10)).await;
        assert_eq!(report.price, Some(price));
        assert!(report.flash_crash.is_none());
    }

    monitor.agent().set_mock_price(SYMBOL, Some(dec!(0.000001)));
    let report = monitor.tick(t0 + Duration::seconds(40)).await;
    assert_eq!(report.price, Some(dec!(0.000001)));
}

#[tokio::test]
async fn test_simulation_keeps_closed_heartbeat() {
    let mut config = Config::default();
    config.monitor.market_index_symbol = None;
    config.schedule.simulation = true;
    let agent = Arc::new(MarketDataAgent::new(&config).unwrap());
    let shared = Arc::new(SharedConfig::new(AlertConfig::new("AAPL", dec!(200), dec!(0))));
    let monitor = Monitor::new(agent, shared, Arc::new(RecordingNarrator::default()), &config);

    // Saturday
    let report = monitor.tick("2024-06-08T15:00:00Z".parse().unwrap()).await;
    assert!(!report.market_open);
    assert_eq!(report.next_delay, std::time::Duration::from_secs(60));
}
