//! Market data: provider abstraction, Yahoo Finance client, fetch orchestration.

pub mod fetch;
pub mod provider;
pub mod yahoo;

pub use fetch::{fetch_ticker, CategoryOutcome, CategoryReport, FetchOptions, FetchReport};
pub use provider::{DataError, HistoryRequest, Interval, MarketDataProvider, Period};
pub use yahoo::YahooProvider;
