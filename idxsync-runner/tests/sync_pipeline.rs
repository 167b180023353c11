//! Integration tests for the sync pipeline: scripted provider, in-memory store.
//!
//! Verifies per-category isolation end to end: a failing provider call or a
//! failing collection write costs exactly that category and nothing else.

use chrono::DateTime;
use idxsync_core::data::{DataError, HistoryRequest, Interval, MarketDataProvider};
use idxsync_core::value::{IndexKey, IndexedSeries, Table};
use idxsync_core::{Category, ProviderValue, Record};
use idxsync_runner::store::{DocumentStore, MemoryStore, StoreError};
use idxsync_runner::{load_tickers, run_sync, SyncOptions};
use polars::prelude::*;
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;

const JAN_2_2024_MS: i64 = 1_704_153_600_000;

/// Provider returning a fixed, plausible payload for every category,
/// except those named in `failing`.
struct Scripted {
    failing: Vec<Category>,
    close: f64,
}

impl Scripted {
    fn healthy() -> Self {
        Self {
            failing: vec![],
            close: 9400.0,
        }
    }

    fn check(&self, category: Category) -> Result<(), DataError> {
        if self.failing.contains(&category) {
            Err(DataError::Other(format!("{category} unavailable")))
        } else {
            Ok(())
        }
    }
}

fn price_table(index: &str, close: f64) -> ProviderValue {
    let times = Column::new(index.into(), vec![JAN_2_2024_MS])
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
    let df = DataFrame::new(vec![
        times,
        Column::new("Open".into(), vec![close - 25.0]),
        Column::new("Close".into(), vec![close]),
        Column::new("Volume".into(), vec![52_000_000_i64]),
    ])
    .unwrap();
    ProviderValue::Table(Table::new(df).with_index(index))
}

fn keyed(name: &str, value: f64) -> ProviderValue {
    let mut series = IndexedSeries::new(name);
    series.push(
        IndexKey::Time(DateTime::from_timestamp_millis(JAN_2_2024_MS).unwrap()),
        ProviderValue::float(value),
    );
    ProviderValue::IndexedSeries(series)
}

impl MarketDataProvider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn quote_info(&self, symbol: &str) -> Result<ProviderValue, DataError> {
        self.check(Category::Stocks)?;
        Ok(ProviderValue::from(json!({
            "symbol": symbol,
            "longName": "PT Bank Central Asia Tbk",
            "currentPrice": self.close,
        })))
    }

    fn price_history(&self, _: &str, request: HistoryRequest) -> Result<ProviderValue, DataError> {
        match request.interval {
            Interval::Daily => {
                self.check(Category::Historical)?;
                Ok(price_table("Date", self.close))
            }
            Interval::Hourly => {
                self.check(Category::Intraday)?;
                Ok(price_table("Datetime", self.close))
            }
        }
    }

    fn financials(&self, _: &str) -> Result<ProviderValue, DataError> {
        self.check(Category::Financials)?;
        let df = DataFrame::new(vec![
            Column::new("index".into(), vec!["TotalRevenue", "NetIncome"]),
            Column::new("2023-12-31T00:00:00.000Z".into(), vec![101.0e12, 48.6e12]),
        ])
        .unwrap();
        Ok(ProviderValue::Table(Table::new(df).with_index("index")))
    }

    fn dividends(&self, _: &str) -> Result<ProviderValue, DataError> {
        self.check(Category::Dividends)?;
        Ok(keyed("Dividends", 227.5))
    }

    fn splits(&self, _: &str) -> Result<ProviderValue, DataError> {
        self.check(Category::Splits)?;
        Ok(keyed("Stock Splits", 5.0))
    }

    fn news(&self, _: &str) -> Result<Vec<Value>, DataError> {
        self.check(Category::News)?;
        Ok(vec![json!({
            "title": "BCA books record profit",
            "publisher": "Reuters",
            "link": "https://example.com/bca",
            "providerPublishTime": 1_706_000_000,
            "type": "STORY",
            "relatedTickers": ["BBCA.JK"],
        })])
    }
}

/// Store whose writes to one collection always fail.
struct FailingCollection {
    inner: MemoryStore,
    broken: &'static str,
}

impl FailingCollection {
    fn guard(&self, collection: &str) -> Result<(), StoreError> {
        if collection == self.broken {
            Err(StoreError::Write {
                collection: collection.to_string(),
                message: "disk full".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for FailingCollection {
    fn upsert_merge(&self, collection: &str, ticker: &str, record: &Record) -> Result<(), StoreError> {
        self.guard(collection)?;
        self.inner.upsert_merge(collection, ticker, record)
    }

    fn replace_for_ticker(
        &self,
        collection: &str,
        ticker: &str,
        records: &[Record],
    ) -> Result<usize, StoreError> {
        self.guard(collection)?;
        self.inner.replace_for_ticker(collection, ticker, records)
    }

    fn find_by_ticker(&self, collection: &str, ticker: &str) -> Result<Vec<Record>, StoreError> {
        self.inner.find_by_ticker(collection, ticker)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.inner.count(collection)
    }
}

fn opts() -> SyncOptions {
    SyncOptions {
        delay: Duration::ZERO,
        ..SyncOptions::default()
    }
}

fn bbca() -> Vec<String> {
    vec!["BBCA".to_string()]
}

#[test]
fn healthy_ticker_fills_all_seven_collections() {
    let store = MemoryStore::new();
    let summary = run_sync(&Scripted::healthy(), &store, &bbca(), &opts(), None);

    assert_eq!(summary.categories_stored(), 7);
    assert_eq!(summary.clean_tickers(), 1);
    for category in Category::ALL {
        let docs = store.find_by_ticker(category.collection(), "BBCA").unwrap();
        assert!(!docs.is_empty(), "{category} empty");
        for doc in &docs {
            assert_eq!(doc.keys().next().map(String::as_str), Some("ticker"));
            assert_eq!(doc["ticker"], "BBCA");
        }
    }
    assert_eq!(store.count("financials").unwrap(), 2);
}

#[test]
fn stored_documents_have_expected_shape() {
    let store = MemoryStore::new();
    run_sync(&Scripted::healthy(), &store, &bbca(), &opts(), None);

    let historical = store.find_by_ticker("historical", "BBCA").unwrap();
    assert_eq!(
        Value::Object(historical[0].clone()),
        json!({
            "ticker": "BBCA",
            "Date": "2024-01-02T00:00:00.000Z",
            "Open": 9375.0,
            "Close": 9400.0,
            "Volume": 52_000_000_i64,
        })
    );

    let intraday = store.find_by_ticker("intraday", "BBCA").unwrap();
    assert_eq!(intraday[0]["Datetime"], "2024-01-02T00:00:00.000Z");

    let dividends = store.find_by_ticker("dividends", "BBCA").unwrap();
    assert_eq!(
        Value::Object(dividends[0].clone()),
        json!({"ticker": "BBCA", "date": "2024-01-02T00:00:00.000Z", "dividend": 227.5})
    );

    let splits = store.find_by_ticker("splits", "BBCA").unwrap();
    assert_eq!(splits[0]["split"], 5.0);

    let news = store.find_by_ticker("news", "BBCA").unwrap();
    assert_eq!(news[0]["publishTime"], 1_706_000_000);
    assert_eq!(news[0]["thumbnail"], "");

    let stocks = store.find_by_ticker("stocks", "BBCA").unwrap();
    assert_eq!(stocks[0]["info"]["symbol"], "BBCA.JK");
    assert!(stocks[0]["last_updated"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn one_fetch_failure_leaves_other_six_stored() {
    let store = MemoryStore::new();
    let provider = Scripted {
        failing: vec![Category::Financials],
        close: 9400.0,
    };
    let summary = run_sync(&provider, &store, &bbca(), &opts(), None);

    assert_eq!(summary.fetch_failures(), 1);
    assert_eq!(summary.categories_stored(), 6);
    assert_eq!(store.count("financials").unwrap(), 0);
    for category in Category::ALL.into_iter().filter(|c| *c != Category::Financials) {
        assert!(store.count(category.collection()).unwrap() > 0, "{category} missing");
    }
}

#[test]
fn one_store_failure_leaves_other_six_stored() {
    let store = FailingCollection {
        inner: MemoryStore::new(),
        broken: "historical",
    };
    let summary = run_sync(&Scripted::healthy(), &store, &bbca(), &opts(), None);

    assert_eq!(summary.store_failures(), 1);
    assert_eq!(summary.categories_stored(), 6);
    assert_eq!(store.count("historical").unwrap(), 0);
    assert_eq!(store.count("intraday").unwrap(), 1);
}

#[test]
fn quote_failure_still_upserts_stock_stub() {
    let store = MemoryStore::new();
    let provider = Scripted {
        failing: vec![Category::Stocks],
        close: 9400.0,
    };
    run_sync(&provider, &store, &bbca(), &opts(), None);

    let stocks = store.find_by_ticker("stocks", "BBCA").unwrap();
    assert_eq!(stocks.len(), 1);
    assert!(stocks[0].contains_key("last_updated"));
    assert!(!stocks[0].contains_key("info"));
}

#[test]
fn resync_replaces_lists_and_merges_stock() {
    let store = MemoryStore::new();
    run_sync(&Scripted::healthy(), &store, &bbca(), &opts(), None);

    let later = Scripted {
        failing: vec![Category::Stocks],
        close: 9500.0,
    };
    run_sync(&later, &store, &bbca(), &opts(), None);

    let historical = store.find_by_ticker("historical", "BBCA").unwrap();
    assert_eq!(historical.len(), 1);
    assert_eq!(historical[0]["Close"], 9500.0);

    // The stub refreshes last_updated without dropping the earlier info.
    let stocks = store.find_by_ticker("stocks", "BBCA").unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0]["info"]["currentPrice"], 9400.0);
}

#[test]
fn ticker_list_drives_the_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "No;Code;Company Name").unwrap();
    writeln!(file, "1;BBCA;Bank Central Asia Tbk.").unwrap();
    writeln!(file, "2;TLKM;Telkom Indonesia (Persero) Tbk.").unwrap();

    let tickers = load_tickers(file.path());
    let store = MemoryStore::new();
    let summary = run_sync(&Scripted::healthy(), &store, &tickers, &opts(), None);

    assert_eq!(summary.ticker_count(), 2);
    assert_eq!(store.count("stocks").unwrap(), 2);
    assert_eq!(store.find_by_ticker("news", "TLKM").unwrap().len(), 1);
}

#[test]
fn missing_ticker_list_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let tickers = load_tickers(&dir.path().join("idx.csv"));
    let store = MemoryStore::new();
    let summary = run_sync(&Scripted::healthy(), &store, &tickers, &opts(), None);

    assert_eq!(summary.ticker_count(), 0);
    assert!(store.collection_names().is_empty());
}
