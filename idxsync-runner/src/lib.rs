//! IDX sync runner: configuration, ticker lists, document stores and the
//! sync run itself.
//!
//! This crate builds on `idxsync-core` to provide:
//! - Environment configuration with `.env` support
//! - Ticker list loading from semicolon-delimited CSV
//! - The `DocumentStore` trait with MongoDB and in-memory backends
//! - Per-category storage reconciliation
//! - The sequential, paced sync driver

pub mod config;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod tickers;

pub use config::{Config, ConfigError};
pub use pipeline::{run_sync, LogProgress, SyncOptions, SyncProgress, SyncSummary, TickerSummary};
pub use reconcile::{reconcile, ReconcileError, ReconcileReport, WriteOutcome};
pub use store::{DocumentStore, MemoryStore, MongoStore, StoreError};
pub use tickers::{load_tickers, read_ticker_file, read_tickers, TickerListError};
