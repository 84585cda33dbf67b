//! News Allocator - simulated news-driven portfolio allocation
//!
//! Each refresh:
//! 1. Pulls headlines from RSS feeds (built-in headlines if none arrive)
//! 2. Scores sentiment and impact per headline
//! 3. Derives a market regime
//! 4. Rebuilds the bullish and bearish portfolios under cap and turnover limits
//! 5. Journals news, sentiment, snapshots and decisions
//!
//! Pass `--once` to run a single cycle and print the result.

use std::sync::Arc;
use tracing::info;

use news_allocator::{
    AllocatorConfig, AllocatorRunner, CycleReport, HttpPriceSource, JournalSink, PortfolioKind,
    PriceSource, RssHeadlineSource, StateManager, StaticPriceSource, WeightRow,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting News Allocator...");

    let once = std::env::args().skip(1).any(|a| a == "--once");

    let config = AllocatorConfig::load()?;
    info!(
        "Journal: {}, universes: {} bullish / {} bearish",
        config.journal_dir.display(),
        config.bullish_universe.len(),
        config.bearish_universe.len()
    );

    let headlines = Arc::new(RssHeadlineSource::new(config.feeds.clone())?);

    let prices: Arc<dyn PriceSource> = match &config.price_api_url {
        Some(url) => {
            info!("Display prices from {}", url);
            Arc::new(HttpPriceSource::new(url)?)
        }
        None => Arc::new(StaticPriceSource::default()),
    };

    let sink = Arc::new(JournalSink::new(&config.journal_dir));
    sink.init().await?;

    let state_manager = StateManager::new(&config.journal_dir);
    state_manager.init().await?;

    let mut runner = AllocatorRunner::new(config, headlines, prices, sink)
        .with_state_manager(state_manager);

    if once {
        let report = runner.run_cycle().await?;
        print_report(&report);
        for d in runner.recent_decisions(5).await? {
            println!("{} [{}] {}", d.created_at, d.regime, d.message);
        }
        return Ok(());
    }

    runner.run().await?;
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!(
        "Regime: {} ({}) from {} headlines{}",
        report.regime.regime,
        report.regime.reason,
        report.analyzed.len(),
        if report.used_fallback { " [fallback]" } else { "" }
    );
    print_rows(PortfolioKind::Bullish.display_name(), &report.bull_rows);
    print_rows(PortfolioKind::Bearish.display_name(), &report.bear_rows);
}

fn print_rows(title: &str, rows: &[WeightRow]) {
    println!("\n{}", title);
    for row in rows {
        let price = row
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!("  {:<6} {:>6.2}%  {:>10}", row.ticker, row.weight * 100.0, price);
    }
}
