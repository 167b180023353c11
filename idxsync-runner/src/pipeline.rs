//! Sync run driver.
//!
//! Tickers are processed strictly in order: fetch every category, reconcile
//! the result set, pause for the pacing delay, move on. Nothing a single
//! ticker does can abort the run.

use crate::config::Config;
use crate::reconcile::reconcile;
use crate::store::DocumentStore;
use idxsync_core::data::{fetch_ticker, FetchOptions, MarketDataProvider};
use idxsync_core::ticker::Ticker;
use std::time::Duration;
use tracing::{info, warn};

/// Options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Exchange suffix appended for provider lookups.
    pub suffix: String,
    pub fetch: FetchOptions,
    /// Pause between consecutive tickers.
    pub delay: Duration,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            suffix: config.ticker_suffix.clone(),
            fetch: FetchOptions {
                period: config.fetch_period,
            },
            delay: config.fetch_delay,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What happened to one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerSummary {
    /// Clean (storage) form of the ticker.
    pub ticker: String,
    pub categories_stored: usize,
    pub fetch_failures: usize,
    pub store_failures: usize,
}

impl TickerSummary {
    pub fn is_clean(&self) -> bool {
        self.fetch_failures == 0 && self.store_failures == 0
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub tickers: Vec<TickerSummary>,
}

impl SyncSummary {
    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn categories_stored(&self) -> usize {
        self.tickers.iter().map(|t| t.categories_stored).sum()
    }

    pub fn fetch_failures(&self) -> usize {
        self.tickers.iter().map(|t| t.fetch_failures).sum()
    }

    pub fn store_failures(&self) -> usize {
        self.tickers.iter().map(|t| t.store_failures).sum()
    }

    /// Tickers that completed without any category failure.
    pub fn clean_tickers(&self) -> usize {
        self.tickers.iter().filter(|t| t.is_clean()).count()
    }
}

/// Progress callback for sync runs.
pub trait SyncProgress {
    /// Called before a ticker is fetched.
    fn on_start(&self, ticker: &Ticker, index: usize, total: usize);

    /// Called once a ticker has been fetched and stored.
    fn on_complete(&self, ticker: &Ticker, index: usize, total: usize, summary: &TickerSummary);

    /// Called when every ticker is done.
    fn on_batch_complete(&self, summary: &SyncSummary);
}

/// Progress reporter that writes to the `tracing` log.
pub struct LogProgress;

impl SyncProgress for LogProgress {
    fn on_start(&self, ticker: &Ticker, index: usize, total: usize) {
        info!("[{}/{}] processing {ticker}", index + 1, total);
    }

    fn on_complete(&self, ticker: &Ticker, _index: usize, _total: usize, summary: &TickerSummary) {
        if summary.is_clean() {
            info!(ticker = %ticker, stored = summary.categories_stored, "ticker done");
        } else {
            warn!(
                ticker = %ticker,
                stored = summary.categories_stored,
                fetch_failures = summary.fetch_failures,
                store_failures = summary.store_failures,
                "ticker done with failures"
            );
        }
    }

    fn on_batch_complete(&self, summary: &SyncSummary) {
        info!(
            tickers = summary.ticker_count(),
            clean = summary.clean_tickers(),
            stored = summary.categories_stored(),
            fetch_failures = summary.fetch_failures(),
            store_failures = summary.store_failures(),
            "sync complete"
        );
    }
}

/// Fetch and store every ticker in `tickers`, in order.
pub fn run_sync(
    provider: &dyn MarketDataProvider,
    store: &dyn DocumentStore,
    tickers: &[String],
    opts: &SyncOptions,
    progress: Option<&dyn SyncProgress>,
) -> SyncSummary {
    let total = tickers.len();
    let mut summary = SyncSummary::default();

    for (i, raw) in tickers.iter().enumerate() {
        let ticker = Ticker::new(raw, &opts.suffix);
        if let Some(p) = progress {
            p.on_start(&ticker, i, total);
        }

        let fetched = fetch_ticker(provider, &ticker, &opts.fetch);
        let stored = reconcile(store, ticker.clean(), &fetched.results);

        let ticker_summary = TickerSummary {
            ticker: ticker.clean().to_string(),
            categories_stored: stored.stored(),
            fetch_failures: fetched.failure_count(),
            store_failures: stored.failure_count(),
        };
        if let Some(p) = progress {
            p.on_complete(&ticker, i, total, &ticker_summary);
        }
        summary.tickers.push(ticker_summary);

        if i + 1 < total && !opts.delay.is_zero() {
            std::thread::sleep(opts.delay);
        }
    }

    if let Some(p) = progress {
        p.on_batch_complete(&summary);
    }
    summary
}
