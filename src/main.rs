use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use breakoutbot::api::{PaperBroker, SimulatedMarket};
use breakoutbot::execution::{Clock, Scheduler, SystemClock, TradingSession};
use breakoutbot::models::Candle;
use breakoutbot::risk::PositionSizer;
use breakoutbot::{strategy, EngineConfig};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "breakoutbot", about = "Opening range breakout trading engine")]
struct Cli {
    /// TOML config file (BREAKOUT_* environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Paper trade against a simulated market until Ctrl+C
    Run {
        /// Comma-separated symbols to watch
        #[arg(short, long, value_delimiter = ',', required = true)]
        symbols: Vec<String>,

        /// Level strategy (ORB, ORB_CLOSE)
        #[arg(long)]
        strategy: Option<String>,

        /// Seed for the simulated market
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Compute breakout levels and position size from a JSON file of candles
    Levels {
        /// JSON array of candles, oldest first
        file: PathBuf,

        #[arg(long, default_value = "X")]
        symbol: String,

        #[arg(long)]
        strategy: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Run {
            symbols,
            strategy,
            seed,
        } => {
            if let Some(name) = strategy {
                config.strategy.name = name;
            }
            run(symbols, config, seed).await
        }
        Command::Levels {
            file,
            symbol,
            strategy,
        } => {
            if let Some(name) = strategy {
                config.strategy.name = name;
            }
            print_levels(&file, &symbol, &config)
        }
    }
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("breakoutbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(symbols: Vec<String>, config: EngineConfig, seed: u64) -> anyhow::Result<()> {
    let session = TradingSession::from_config(&config.session)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if !session.is_open(clock.now()) {
        tracing::info!(
            "Market is closed ({} - {} exchange time); monitors will idle until it opens",
            config.session.start,
            config.session.end
        );
    }

    let market = Arc::new(SimulatedMarket::new(clock.clone(), session, seed));
    let broker = Arc::new(PaperBroker::new());
    let scheduler = Scheduler::new(market, broker.clone()).with_clock(clock);

    scheduler.start(symbols, config).await?;
    tracing::info!("Press Ctrl+C to stop...");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    tracing::info!("Received Ctrl+C, shutting down...");

    scheduler.stop().await;

    let open = scheduler.open_positions().await;
    if !open.is_empty() {
        tracing::warn!("{} paper positions left open", open.len());
    }
    tracing::info!("Paper fills: {}", broker.fills().len());

    Ok(())
}

fn print_levels(file: &Path, symbol: &str, config: &EngineConfig) -> anyhow::Result<()> {
    config.validate(&[symbol.to_string()])?;

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading candles from {}", file.display()))?;
    let candles: Vec<Candle> = serde_json::from_str(&raw).context("parsing candles")?;

    let calculator = strategy::from_config(&config.strategy)?;
    let levels = calculator.compute_levels(symbol, &candles)?;
    let sizer = PositionSizer::from_config(&config.risk);
    let quantity = sizer.size(levels.trigger_price, levels.stop_price);

    let report = json!({
        "strategy": calculator.name(),
        "levels": levels,
        "quantity": quantity,
        "risk_amount": sizer.risk_amount(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
