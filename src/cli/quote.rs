//! Quote command implementation

use clap::Args;

use crate::config::Config;
use crate::market::MarketDataAgent;
use crate::monitor::normalize_symbol;

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Symbol to look up (e.g. AAPL, 2330.TW, BTC-USD)
    pub symbol: String,
}

impl QuoteArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbol = normalize_symbol(&self.symbol)?;
        let agent = MarketDataAgent::new(config)?;
        let snapshot = agent.get_market_data(&symbol).await;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);

        if snapshot.price.is_none() {
            anyhow::bail!("no price available for {}", symbol);
        }
        Ok(())
    }
}
