//! Configuration loading

use rust_decimal_macros::dec;
use std::io::Write;
use stocklight::alert::AlertConfig;
use stocklight::config::{Config, LogFormat};
use stocklight::monitor::{AlertConfigUpdate, SharedConfig};

#[test]
fn test_example_config_loads_from_disk() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();
    assert_eq!(config.monitor.symbol, "2330.TW");
    assert_eq!(config.alert.flash_crash_suppression_secs, 60);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.narration.command.is_none());
}

#[test]
fn test_partial_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[monitor]\nsymbol = \"ETH-USD\"\ntarget_price = 3500").unwrap();
    writeln!(file, "[schedule]\nsimulation = true").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.monitor.symbol, "ETH-USD");
    assert_eq!(config.monitor.target_price, dec!(3500));
    assert!(config.schedule.simulation);
    assert_eq!(config.cleaner.capacity, 100);
}

#[test]
fn test_shared_config_seeded_from_file_config() {
    let config: Config = toml::from_str("[monitor]\nsymbol = \" aapl \"\ntarget_price = 200").unwrap();
    let shared = SharedConfig::from_monitor_config(&config.monitor);
    assert_eq!(
        shared.snapshot(),
        AlertConfig::new("AAPL", dec!(200), dec!(0))
    );

    shared.update(AlertConfigUpdate {
        stop_loss_price: Some("180".into()),
        ..Default::default()
    });
    assert_eq!(shared.snapshot().stop_loss_price, dec!(180));
}
