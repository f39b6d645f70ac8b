use clap::Parser;
use stocklight::cli::{Cli, Commands};
use stocklight::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example"))?
        }
    };

    // Initialize telemetry
    let _telemetry = stocklight::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting monitor");
            args.execute(&config).await?;
        }
        Commands::Quote(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Monitor: {} target={} stop_loss={}",
                config.monitor.symbol, config.monitor.target_price, config.monitor.stop_loss_price
            );
            println!(
                "  Index: {}",
                config.monitor.market_index_symbol.as_deref().unwrap_or("-")
            );
            println!(
                "  Schedule: open={}s closed={}s simulation={}",
                config.schedule.open_interval_secs,
                config.schedule.closed_interval_secs,
                config.schedule.simulation
            );
            println!(
                "  Alert: cooldown={}s alarm_repeat={}s flash_crash_quiet={}s",
                config.alert.cooldown_secs,
                config.alert.alarm_repeat_secs,
                config.alert.flash_crash_suppression_secs
            );
            println!(
                "  Flash crash: drop>={} z<{} window={}s",
                config.flash_crash.drop_threshold,
                config.flash_crash.z_threshold,
                config.flash_crash.window_secs
            );
            println!(
                "  Narration: {}",
                config.narration.command.as_deref().unwrap_or("log")
            );
        }
    }

    Ok(())
}
