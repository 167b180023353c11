//! idxsync CLI: sync IDX market data from Yahoo Finance into MongoDB.
//!
//! Commands:
//! - `sync`: fetch every ticker in the list and reconcile it into the store
//! - `fetch`: fetch one ticker and print its result set as JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use idxsync_core::data::{fetch_ticker, FetchOptions, Period, YahooProvider};
use idxsync_core::{Category, Ticker};
use idxsync_runner::{
    load_tickers, run_sync, Config, DocumentStore, LogProgress, MemoryStore, MongoStore,
    SyncOptions,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "idxsync",
    about = "Sync Indonesia Stock Exchange market data from Yahoo Finance into MongoDB"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every listed ticker and store it, one ticker at a time.
    Sync {
        /// Ticker list (semicolon-delimited CSV with a `Code` column). Defaults to CSV_FILE_PATH.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Tickers to sync instead of reading the list (e.g., BBCA TLKM).
        #[arg(long, num_args = 1..)]
        tickers: Vec<String>,

        /// Exchange suffix for provider lookups. Defaults to TICKER_SUFFIX.
        #[arg(long)]
        suffix: Option<String>,

        /// Price-history lookback: 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
        #[arg(long)]
        period: Option<String>,

        /// Seconds to wait between tickers. Defaults to FETCH_DELAY_SECS.
        #[arg(long)]
        delay_secs: Option<u64>,

        /// Articles requested per news lookup (default 10).
        #[arg(long)]
        news_count: Option<u32>,

        /// Store into memory and print collection counts instead of writing to MongoDB.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Fetch one ticker and print its data as JSON without storing it.
    Fetch {
        /// Ticker symbol, with or without the exchange suffix.
        ticker: String,

        /// Exchange suffix for provider lookups. Defaults to TICKER_SUFFIX.
        #[arg(long)]
        suffix: Option<String>,

        /// Price-history lookback. Defaults to FETCH_PERIOD.
        #[arg(long)]
        period: Option<String>,

        /// Articles requested per news lookup (default 10).
        #[arg(long)]
        news_count: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("reading configuration")?;

    match cli.command {
        Commands::Sync {
            csv,
            tickers,
            suffix,
            period,
            delay_secs,
            news_count,
            dry_run,
        } => {
            if let Some(path) = csv {
                config.csv_file_path = path;
            }
            if let Some(secs) = delay_secs {
                config.fetch_delay = Duration::from_secs(secs);
            }
            apply_overrides(&mut config, suffix, period)?;
            run_sync_cmd(&config, tickers, news_count, dry_run)
        }
        Commands::Fetch {
            ticker,
            suffix,
            period,
            news_count,
        } => {
            apply_overrides(&mut config, suffix, period)?;
            run_fetch_cmd(&config, &ticker, news_count)
        }
    }
}

fn apply_overrides(config: &mut Config, suffix: Option<String>, period: Option<String>) -> Result<()> {
    if let Some(suffix) = suffix {
        config.ticker_suffix = suffix;
    }
    if let Some(period) = period {
        config.fetch_period = period.parse::<Period>()?;
    }
    Ok(())
}

fn yahoo(news_count: Option<u32>) -> Result<YahooProvider> {
    let provider = YahooProvider::new()?;
    Ok(match news_count {
        Some(n) => provider.with_news_count(n),
        None => provider,
    })
}

fn run_sync_cmd(
    config: &Config,
    tickers: Vec<String>,
    news_count: Option<u32>,
    dry_run: bool,
) -> Result<()> {
    let tickers = if tickers.is_empty() {
        load_tickers(&config.csv_file_path)
    } else {
        tickers
    };
    info!(
        tickers = tickers.len(),
        suffix = %config.ticker_suffix,
        period = %config.fetch_period,
        delay_secs = config.fetch_delay.as_secs(),
        dry_run,
        "starting sync"
    );

    let provider = yahoo(news_count)?;
    let opts = SyncOptions::from_config(config);

    if dry_run {
        let store = MemoryStore::new();
        run_sync(&provider, &store, &tickers, &opts, Some(&LogProgress));
        print_collection_counts(&store)?;
    } else {
        let store = MongoStore::connect(&config.mongo_uri, &config.db_name)
            .with_context(|| format!("connecting to MongoDB at {}", config.mongo_uri))?;
        run_sync(&provider, &store, &tickers, &opts, Some(&LogProgress));
    }

    Ok(())
}

fn run_fetch_cmd(config: &Config, symbol: &str, news_count: Option<u32>) -> Result<()> {
    let ticker = Ticker::new(symbol, &config.ticker_suffix);
    let provider = yahoo(news_count)?;
    let opts = FetchOptions {
        period: config.fetch_period,
    };

    let report = fetch_ticker(&provider, &ticker, &opts);
    println!("{}", serde_json::to_string_pretty(&report.results)?);

    if report.failure_count() > 0 {
        let failed: Vec<&str> = report.failures().map(|(c, _)| c.name()).collect();
        eprintln!("Failed categories for {ticker}: {}", failed.join(", "));
    }
    Ok(())
}

fn print_collection_counts(store: &MemoryStore) -> Result<()> {
    println!("{:<12} {:>9}", "collection", "documents");
    for category in Category::ALL {
        let count = store.count(category.collection())?;
        println!("{:<12} {:>9}", category.collection(), count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_count_flag_parses_on_both_commands() {
        let cli = Cli::try_parse_from(["idxsync", "sync", "--dry-run", "--news-count", "25"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sync { news_count: Some(25), dry_run: true, .. }
        ));

        let cli = Cli::try_parse_from(["idxsync", "fetch", "BBCA", "--news-count", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Fetch { news_count: Some(3), .. }));

        let cli = Cli::try_parse_from(["idxsync", "fetch", "BBCA"]).unwrap();
        assert!(matches!(cli.command, Commands::Fetch { news_count: None, .. }));
    }
}
