//! Fetch orchestrator: one ticker, seven independent categories.
//!
//! Each category is fetched, sanitized and shaped on its own. A failure is
//! logged and recorded in the report; it never stops the other categories.

use super::provider::{DataError, HistoryRequest, MarketDataProvider, Period};
use crate::category::{Category, CategoryResult, Record, ResultSet};
use crate::sanitize::{iso8601, sanitize};
use crate::shape::{explode_keyed_series, project_article, shape, TICKER_FIELD};
use crate::ticker::Ticker;
use crate::value::ProviderValue;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info};

/// Options for a single-ticker fetch.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Lookback window for the daily and hourly price series.
    pub period: Period,
}

/// What happened to one category.
#[derive(Debug)]
pub enum CategoryOutcome {
    /// Data was produced; holds the number of records.
    Fetched(usize),
    /// The provider returned nothing. The category is left out of the result set.
    Empty,
    Failed(DataError),
}

#[derive(Debug)]
pub struct CategoryReport {
    pub category: Category,
    pub outcome: CategoryOutcome,
}

/// Result of fetching one ticker: the result set plus a per-category outcome.
#[derive(Debug)]
pub struct FetchReport {
    pub ticker: Ticker,
    pub results: ResultSet,
    pub outcomes: Vec<CategoryReport>,
}

impl FetchReport {
    /// Categories whose fetch failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (Category, &DataError)> {
        self.outcomes.iter().filter_map(|r| match &r.outcome {
            CategoryOutcome::Failed(e) => Some((r.category, e)),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn outcome(&self, category: Category) -> Option<&CategoryOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.category == category)
            .map(|r| &r.outcome)
    }
}

/// Fetch every category for `ticker`.
///
/// The returned result set holds only categories that produced data, except
/// `stocks`, which is always present: when quote info cannot be fetched it
/// falls back to `{ticker, last_updated}` so the ticker's stocks document is
/// still upserted.
pub fn fetch_ticker(
    provider: &dyn MarketDataProvider,
    ticker: &Ticker,
    opts: &FetchOptions,
) -> FetchReport {
    let symbol = ticker.suffixed();
    let fetched_at = iso8601(&Utc::now());
    info!(ticker = %symbol, provider = provider.name(), "fetching ticker data");

    let mut results = ResultSet::new();
    let mut outcomes = Vec::with_capacity(Category::ALL.len());

    for category in Category::ALL {
        let fetched = fetch_category(provider, category, &symbol, ticker.clean(), &fetched_at, opts);
        let outcome = match fetched {
            Ok(Some(result)) => {
                let count = result.len();
                debug!(ticker = %symbol, %category, count, "category fetched");
                results.insert(category, result);
                CategoryOutcome::Fetched(count)
            }
            Ok(None) => {
                debug!(ticker = %symbol, %category, "category empty, skipped");
                CategoryOutcome::Empty
            }
            Err(e) => {
                error!(ticker = %symbol, %category, error = %e, "error fetching category");
                CategoryOutcome::Failed(e)
            }
        };
        outcomes.push(CategoryReport { category, outcome });
    }

    if !results.contains(Category::Stocks) {
        results.insert(
            Category::Stocks,
            CategoryResult::Single(stock_stub(ticker.clean(), &fetched_at)),
        );
    }

    FetchReport {
        ticker: ticker.clone(),
        results,
        outcomes,
    }
}

fn fetch_category(
    provider: &dyn MarketDataProvider,
    category: Category,
    symbol: &str,
    clean: &str,
    fetched_at: &str,
    opts: &FetchOptions,
) -> Result<Option<CategoryResult>, DataError> {
    match category {
        Category::Stocks => {
            let info = provider.quote_info(symbol)?;
            let mut record = stock_stub(clean, fetched_at);
            record.insert("info".to_string(), sanitize(&info));
            Ok(Some(CategoryResult::Single(record)))
        }
        Category::Historical => {
            let table = provider.price_history(symbol, HistoryRequest::daily(opts.period))?;
            rows_category(&table, clean)
        }
        Category::Intraday => {
            let table = provider.price_history(symbol, HistoryRequest::hourly(opts.period))?;
            rows_category(&table, clean)
        }
        Category::Financials => rows_category(&provider.financials(symbol)?, clean),
        Category::Dividends => keyed_category(&provider.dividends(symbol)?, clean, "dividend"),
        Category::Splits => keyed_category(&provider.splits(symbol)?, clean, "split"),
        Category::News => {
            let articles = provider.news(symbol)?;
            if articles.is_empty() {
                return Ok(None);
            }
            let records = articles.iter().map(|a| project_article(a, clean)).collect();
            Ok(Some(CategoryResult::List(records)))
        }
    }
}

fn stock_stub(clean: &str, fetched_at: &str) -> Record {
    let mut record = Record::new();
    record.insert(TICKER_FIELD.to_string(), Value::String(clean.to_string()));
    record.insert("last_updated".to_string(), Value::String(fetched_at.to_string()));
    record
}

/// Sanitize a table-like value into ticker-tagged row records.
fn rows_category(value: &ProviderValue, clean: &str) -> Result<Option<CategoryResult>, DataError> {
    if value.is_empty() {
        return Ok(None);
    }
    let rows: Vec<Record> = match shape(sanitize(value), clean) {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        Value::Object(record) => vec![record],
        other => {
            return Err(DataError::ResponseFormatChanged(format!(
                "expected rows, got {other}"
            )))
        }
    };
    Ok((!rows.is_empty()).then_some(CategoryResult::List(rows)))
}

/// Sanitize a keyed series and explode it into one record per date.
fn keyed_category(
    value: &ProviderValue,
    clean: &str,
    value_field: &str,
) -> Result<Option<CategoryResult>, DataError> {
    if value.is_empty() {
        return Ok(None);
    }
    let records = explode_keyed_series(sanitize(value), clean, value_field);
    Ok((!records.is_empty()).then_some(CategoryResult::List(records)))
}
