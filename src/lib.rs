//! stocklight: price watcher that drives an indicator light
//!
//! This library provides the core components for:
//! - Price providers for equities, Taiwan listings and crypto (stream + REST)
//! - Per-symbol sample history with outlier cleaning
//! - Statistical flash-crash detection
//! - Alert state machine with cooldown and a cancelable alarm
//! - Polling monitor that fans alerts out to indicator and narrator seams
//! - Logging and Prometheus metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod crash;
pub mod device;
pub mod error;
pub mod history;
pub mod market;
pub mod monitor;
pub mod provider;
pub mod telemetry;
pub mod ws;
