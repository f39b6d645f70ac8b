//! Configuration types for stocklight

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Longest window a config value may describe (about a century)
const MAX_SPAN_SECS: u64 = 100 * 365 * 86_400;

/// Config seconds as a signed span for timestamp arithmetic
pub fn span(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_SPAN_SECS) as i64)
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub alert: AlertSettings,
    #[serde(default)]
    pub cleaner: CleanerConfig,
    #[serde(default)]
    pub flash_crash: FlashCrashConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub narration: NarrationConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Initial instrument and thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_target_price")]
    pub target_price: Decimal,
    /// Zero disables the stop-loss check
    #[serde(default)]
    pub stop_loss_price: Decimal,
    /// Secondary index shown on the status page
    #[serde(default = "default_market_index")]
    pub market_index_symbol: Option<String>,
}

fn default_symbol() -> String {
    "2330.TW".to_string()
}
fn default_target_price() -> Decimal {
    Decimal::new(950, 0)
}
fn default_market_index() -> Option<String> {
    Some("^TWII".to_string())
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            target_price: default_target_price(),
            stop_loss_price: Decimal::ZERO,
            market_index_symbol: default_market_index(),
        }
    }
}

/// Polling cadence
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_open_interval")]
    pub open_interval_secs: u64,
    #[serde(default = "default_closed_interval")]
    pub closed_interval_secs: u64,
    /// Simulation skips outlier filtering and polls quickly
    #[serde(default)]
    pub simulation: bool,
    #[serde(default = "default_simulation_interval")]
    pub simulation_interval_secs: u64,
}

fn default_open_interval() -> u64 {
    10
}
fn default_closed_interval() -> u64 {
    60
}
fn default_simulation_interval() -> u64 {
    1
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            open_interval_secs: default_open_interval(),
            closed_interval_secs: default_closed_interval(),
            simulation: false,
            simulation_interval_secs: default_simulation_interval(),
        }
    }
}

impl ScheduleConfig {
    /// Delay before the next tick
    pub fn next_delay(&self, market_open: bool) -> Duration {
        let secs = if !market_open {
            self.closed_interval_secs
        } else if self.simulation {
            self.simulation_interval_secs
        } else {
            self.open_interval_secs
        };
        Duration::from_secs(secs)
    }
}

/// Alert timing
#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    /// Minimum gap between two target-hit alerts
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Pause between alarm narrations
    #[serde(default = "default_alarm_repeat")]
    pub alarm_repeat_secs: u64,
    /// Quiet period after a flash-crash alert
    #[serde(default = "default_flash_crash_suppression")]
    pub flash_crash_suppression_secs: u64,
    /// Consecutive missed ticks before reporting degraded status
    #[serde(default = "default_degraded_after")]
    pub degraded_after_failures: u32,
    /// How long an alert color stays before routine ticks reset it
    #[serde(default = "default_indicator_hold")]
    pub indicator_hold_secs: u64,
}

fn default_cooldown() -> u64 {
    300
}
fn default_alarm_repeat() -> u64 {
    10
}
fn default_flash_crash_suppression() -> u64 {
    60
}
fn default_degraded_after() -> u32 {
    3
}
fn default_indicator_hold() -> u64 {
    60
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            alarm_repeat_secs: default_alarm_repeat(),
            flash_crash_suppression_secs: default_flash_crash_suppression(),
            degraded_after_failures: default_degraded_after(),
            indicator_hold_secs: default_indicator_hold(),
        }
    }
}

/// Outlier filter and retention
#[derive(Debug, Clone, Deserialize)]
pub struct CleanerConfig {
    /// Relative jump above which a sample is suspect (0.5 = 50%)
    #[serde(default = "default_max_jump")]
    pub max_jump_ratio: Decimal,
    /// Samples kept per symbol
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Age limit for samples used by crash detection
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
}

fn default_max_jump() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_capacity() -> usize {
    100
}
fn default_retention() -> u64 {
    300
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            max_jump_ratio: default_max_jump(),
            capacity: default_capacity(),
            retention_secs: default_retention(),
        }
    }
}

/// Flash-crash detection thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct FlashCrashConfig {
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_window")]
    pub window_secs: u64,
    #[serde(default = "default_min_window_samples")]
    pub min_window_samples: usize,
    /// Intra-window decline that triggers statistical confirmation
    #[serde(default = "default_drop_threshold")]
    pub drop_threshold: Decimal,
    /// Z-score the current price must fall below
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
}

fn default_min_samples() -> usize {
    5
}
fn default_window() -> u64 {
    60
}
fn default_min_window_samples() -> usize {
    3
}
fn default_drop_threshold() -> Decimal {
    Decimal::new(15, 3) // 0.015 = 1.5%
}
fn default_z_threshold() -> f64 {
    -2.0
}

impl Default for FlashCrashConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            window_secs: default_window(),
            min_window_samples: default_min_window_samples(),
            drop_threshold: default_drop_threshold(),
            z_threshold: default_z_threshold(),
        }
    }
}

/// Data source endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_yahoo_url")]
    pub yahoo_base_url: String,
    #[serde(default = "default_binance_rest")]
    pub binance_rest_url: String,
    #[serde(default = "default_binance_ws")]
    pub binance_ws_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Max age of a streamed crypto price before REST is used
    #[serde(default = "default_freshness")]
    pub crypto_freshness_secs: u64,
}

fn default_yahoo_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}
fn default_binance_rest() -> String {
    "https://api.binance.com".to_string()
}
fn default_binance_ws() -> String {
    "wss://stream.binance.com:9443/ws".to_string()
}
fn default_request_timeout() -> u64 {
    5
}
fn default_freshness() -> u64 {
    5
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            yahoo_base_url: default_yahoo_url(),
            binance_rest_url: default_binance_rest(),
            binance_ws_url: default_binance_ws(),
            request_timeout_secs: default_request_timeout(),
            crypto_freshness_secs: default_freshness(),
        }
    }
}

/// Speech output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NarrationConfig {
    /// External program invoked with the text as its only argument
    pub command: Option<String>,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    pub metrics_port: Option<u16>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
