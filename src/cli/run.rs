//! Run command implementation

use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::device::{CommandNarrator, IndicatorDriver, LogIndicator, LogNarrator, Narrator};
use crate::market::MarketDataAgent;
use crate::monitor::{AlertConfigUpdate, Monitor, SharedConfig};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the watched symbol
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Override the target price
    #[arg(short, long)]
    pub target: Option<String>,

    /// Override the stop-loss price (0 disables)
    #[arg(long)]
    pub stop_loss: Option<String>,

    /// Fast cadence, no outlier filtering
    #[arg(long)]
    pub simulation: bool,

    /// Serve this price instead of querying providers
    #[arg(long)]
    pub mock_price: Option<Decimal>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        config.schedule.simulation |= self.simulation;

        let agent = Arc::new(MarketDataAgent::new(&config)?);
        let shared = Arc::new(SharedConfig::from_monitor_config(&config.monitor));
        let alert_config = shared.update(AlertConfigUpdate {
            symbol: self.symbol.clone(),
            target_price: self.target.clone(),
            stop_loss_price: self.stop_loss.clone(),
        });
        if let Some(price) = self.mock_price {
            agent.set_mock_price(&alert_config.symbol, Some(price));
        }

        let narrator: Arc<dyn Narrator> =
            match config.narration.command.as_deref().and_then(CommandNarrator::new) {
                Some(command) => Arc::new(command),
                None => Arc::new(LogNarrator),
            };

        let monitor = Arc::new(Monitor::new(agent, shared, narrator, &config));
        let driver = IndicatorDriver::new(
            Arc::new(LogIndicator),
            Duration::from_secs(config.alert.indicator_hold_secs),
        );
        let driver_task = tokio::spawn(driver.run(monitor.subscribe()));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(&monitor);
        let loop_task = tokio::spawn(async move { runner.run(shutdown_rx).await });

        // Blocking stdin lives on its own thread so shutdown never waits on it
        let (enter_tx, mut enter_rx) = mpsc::unbounded_channel::<()>();
        std::thread::spawn(move || {
            for line in std::io::stdin().lines() {
                if line.is_err() || enter_tx.send(()).is_err() {
                    break;
                }
            }
        });

        tracing::info!(
            symbol = %alert_config.symbol,
            target = %alert_config.target_price,
            stop_loss = %alert_config.stop_loss_price,
            simulation = config.schedule.simulation,
            "Watching (Enter silences the alarm, Ctrl-C quits)"
        );

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    break;
                }
                Some(()) = enter_rx.recv() => {
                    if !monitor.stop_alarm() {
                        tracing::info!("No alarm to stop");
                    }
                }
            }
        }
        tracing::info!("Shutting down");

        shutdown_tx.send(true)?;
        loop_task.await?;
        drop(monitor);
        // Sender side is gone once every monitor handle is dropped
        if tokio::time::timeout(Duration::from_secs(2), driver_task).await.is_err() {
            tracing::warn!("Indicator driver did not stop in time");
        }
        Ok(())
    }
}
