//! Yahoo Finance data provider.
//!
//! Talks to Yahoo's unofficial JSON endpoints:
//! - `v10/finance/quoteSummary` for quote metadata (needs a cookie + crumb session)
//! - `v8/finance/chart` for price series and dividend/split events
//! - `ws/fundamentals-timeseries` for annual income-statement line items
//! - `v1/finance/search` for news
//!
//! Each call is a single attempt. Pacing between tickers is the caller's job.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::provider::{DataError, HistoryRequest, Interval, MarketDataProvider};
use crate::sanitize::iso8601;
use crate::value::{IndexKey, IndexedSeries, ProviderValue, Table};
use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

const QUERY_HOST: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const QUOTE_MODULES: &str =
    "assetProfile,summaryProfile,summaryDetail,price,financialData,defaultKeyStatistics,quoteType";

/// Annual income-statement line items requested from the fundamentals service.
const INCOME_STATEMENT_ITEMS: &[&str] = &[
    "TotalRevenue",
    "OperatingRevenue",
    "CostOfRevenue",
    "GrossProfit",
    "OperatingExpense",
    "SellingGeneralAndAdministration",
    "OperatingIncome",
    "InterestExpense",
    "InterestIncome",
    "OtherIncomeExpense",
    "PretaxIncome",
    "TaxProvision",
    "NetIncome",
    "NetIncomeCommonStockholders",
    "MinorityInterests",
    "BasicEPS",
    "DilutedEPS",
    "BasicAverageShares",
    "DilutedAverageShares",
    "EBIT",
    "EBITDA",
    "TotalExpenses",
];

/// Start of the fundamentals window (2016-12-31T00:00:00Z).
const FUNDAMENTALS_START: i64 = 1_483_142_400;

// ── chart API response ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
    events: Option<ChartEvents>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
    #[serde(default)]
    splits: HashMap<String, SplitEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct SplitEvent {
    date: i64,
    numerator: f64,
    denominator: f64,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    crumb: Mutex<Option<String>>,
    news_count: u32,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            crumb: Mutex::new(None),
            news_count: 10,
        })
    }

    /// Number of articles requested per news call.
    pub fn with_news_count(mut self, count: u32) -> Self {
        self.news_count = count;
        self
    }

    /// Issue a GET and decode the JSON body, mapping HTTP failures to [`DataError`].
    fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        symbol: &str,
    ) -> Result<Value, DataError> {
        debug!(url, symbol, "yahoo request");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "HTTP {status} for {symbol}"
            )));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        resp.json::<Value>().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })
    }

    /// Session crumb for endpoints that require one. Cached after the first success.
    fn crumb(&self) -> Result<String, DataError> {
        let mut cached = self
            .crumb
            .lock()
            .map_err(|_| DataError::Other("crumb cache poisoned".into()))?;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        if let Err(e) = self.prime_session(COOKIE_URL) {
            warn!(error = %e, "could not prime Yahoo session cookie");
        }

        let resp = self
            .client
            .get(CRUMB_URL)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(DataError::AuthenticationRequired(format!(
                "crumb request returned HTTP {}",
                resp.status()
            )));
        }
        let crumb = resp
            .text()
            .map_err(|e| DataError::AuthenticationRequired(e.to_string()))?
            .trim()
            .to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(DataError::AuthenticationRequired(
                "crumb response was not a token".into(),
            ));
        }

        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    /// Request `url` only for the cookies it sets. The response itself is an
    /// error page, so only transport failures are reported.
    fn prime_session(&self, url: &str) -> Result<(), DataError> {
        self.client
            .get(url)
            .send()
            .map(|_| ())
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))
    }

    fn forget_crumb(&self) {
        if let Ok(mut cached) = self.crumb.lock() {
            *cached = None;
        }
    }

    fn chart(&self, symbol: &str, query: &[(&str, String)]) -> Result<ChartData, DataError> {
        let url = format!("{QUERY_HOST}/v8/finance/chart/{symbol}");
        let body = self.get_json(&url, query, symbol)?;
        let resp: ChartResponse = serde_json::from_value(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("chart response for {symbol}: {e}"))
        })?;
        parse_chart(symbol, resp)
    }

    fn chart_events(&self, symbol: &str) -> Result<ChartEvents, DataError> {
        let data = self.chart(
            symbol,
            &[
                ("range", "max".to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,splits".to_string()),
            ],
        )?;
        Ok(data.events.unwrap_or_default())
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn quote_info(&self, symbol: &str) -> Result<ProviderValue, DataError> {
        let crumb = self.crumb()?;
        let url = format!("{QUERY_HOST}/v10/finance/quoteSummary/{symbol}");
        let body = self
            .get_json(
                &url,
                &[
                    ("modules", QUOTE_MODULES.to_string()),
                    ("crumb", crumb),
                ],
                symbol,
            )
            .map_err(|e| {
                if matches!(e, DataError::AuthenticationRequired(_)) {
                    self.forget_crumb();
                }
                e
            })?;
        parse_quote_summary(symbol, &body)
    }

    fn price_history(
        &self,
        symbol: &str,
        request: HistoryRequest,
    ) -> Result<ProviderValue, DataError> {
        let data = self.chart(
            symbol,
            &[
                ("range", request.period.as_str().to_string()),
                ("interval", request.interval.as_str().to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ],
        )?;
        let index = match request.interval {
            Interval::Daily => "Date",
            Interval::Hourly => "Datetime",
        };
        price_table(data, index).map(ProviderValue::Table)
    }

    fn financials(&self, symbol: &str) -> Result<ProviderValue, DataError> {
        let url = format!(
            "{QUERY_HOST}/ws/fundamentals-timeseries/v1/finance/timeseries/{symbol}"
        );
        let types: Vec<String> = INCOME_STATEMENT_ITEMS
            .iter()
            .map(|item| format!("annual{item}"))
            .collect();
        let body = self.get_json(
            &url,
            &[
                ("symbol", symbol.to_string()),
                ("type", types.join(",")),
                ("period1", FUNDAMENTALS_START.to_string()),
                ("period2", Utc::now().timestamp().to_string()),
            ],
            symbol,
        )?;
        financials_table(&body).map(ProviderValue::Table)
    }

    fn dividends(&self, symbol: &str) -> Result<ProviderValue, DataError> {
        let events = self.chart_events(symbol)?;
        let points = events
            .dividends
            .into_values()
            .map(|d| (d.date, d.amount))
            .collect();
        Ok(ProviderValue::IndexedSeries(keyed_series("Dividends", points)))
    }

    fn splits(&self, symbol: &str) -> Result<ProviderValue, DataError> {
        let events = self.chart_events(symbol)?;
        let points = events
            .splits
            .into_values()
            .filter(|s| s.denominator != 0.0)
            .map(|s| (s.date, s.numerator / s.denominator))
            .collect();
        Ok(ProviderValue::IndexedSeries(keyed_series("Stock Splits", points)))
    }

    fn news(&self, symbol: &str) -> Result<Vec<Value>, DataError> {
        let url = format!("{QUERY_HOST}/v1/finance/search");
        let body = self.get_json(
            &url,
            &[
                ("q", symbol.to_string()),
                ("quotesCount", "0".to_string()),
                ("newsCount", self.news_count.to_string()),
            ],
            symbol,
        )?;
        match body.get("news") {
            Some(Value::Array(articles)) => Ok(articles.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(DataError::ResponseFormatChanged(format!(
                "news is not a list: {other}"
            ))),
        }
    }
}

// ── response parsing ────────────────────────────────────────────────

fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<ChartData, DataError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
        None => DataError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))
}

/// Build the OHLCV table for a chart result. Bars where every field is null
/// (holidays, halted sessions) are dropped. No timestamps yields an empty table.
fn price_table(data: ChartData, index: &str) -> Result<Table, DataError> {
    let timestamps = data.timestamp.unwrap_or_default();
    let (quote, adj_closes) = match data.indicators {
        Some(ind) => (
            ind.quote.into_iter().next().unwrap_or_default(),
            ind.adjclose.and_then(|v| v.into_iter().next()).map(|a| a.adjclose),
        ),
        None => (QuoteData::default(), None),
    };

    let n = timestamps.len();
    let mut times: Vec<i64> = Vec::with_capacity(n);
    let mut opens = Vec::with_capacity(n);
    let mut highs = Vec::with_capacity(n);
    let mut lows = Vec::with_capacity(n);
    let mut closes = Vec::with_capacity(n);
    let mut volumes = Vec::with_capacity(n);
    let mut adj = Vec::with_capacity(n);

    for (i, &ts) in timestamps.iter().enumerate() {
        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none()
        {
            continue;
        }

        times.push(ts * 1_000);
        opens.push(open);
        highs.push(high);
        lows.push(low);
        closes.push(close);
        volumes.push(volume);
        adj.push(adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()));
    }

    let map_err = |e: PolarsError| DataError::ResponseFormatChanged(format!("price table: {e}"));

    let mut columns = vec![
        Column::new(index.into(), times)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(map_err)?,
        Column::new("Open".into(), opens),
        Column::new("High".into(), highs),
        Column::new("Low".into(), lows),
        Column::new("Close".into(), closes),
    ];
    if adj_closes.is_some() {
        columns.push(Column::new("Adj Close".into(), adj));
    }
    columns.push(Column::new("Volume".into(), volumes));

    let frame = DataFrame::new(columns).map_err(map_err)?;
    Ok(Table::new(frame).with_index(index))
}

/// Flatten the quoteSummary modules into one mapping.
///
/// `{raw, fmt}` wrappers collapse to `raw`; `maxAge` bookkeeping fields are
/// dropped. Later modules overwrite earlier ones on key collisions.
fn parse_quote_summary(symbol: &str, body: &Value) -> Result<ProviderValue, DataError> {
    let summary = body
        .get("quoteSummary")
        .ok_or_else(|| DataError::ResponseFormatChanged("missing quoteSummary".into()))?;

    let modules = match summary.get("result").and_then(Value::as_array) {
        Some(result) => result.first().cloned().unwrap_or(Value::Null),
        None => {
            let code = summary
                .get("error")
                .and_then(|e| e.get("code"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(if code == "Not Found" {
                DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }
            } else {
                DataError::ResponseFormatChanged(format!("quoteSummary error: {code}"))
            });
        }
    };

    let mut info = Map::new();
    if let Value::Object(modules) = modules {
        for (_, module) in modules {
            if let Value::Object(fields) = module {
                for (key, value) in fields {
                    if key == "maxAge" {
                        continue;
                    }
                    info.insert(key, unwrap_raw(value));
                }
            }
        }
    }

    Ok(ProviderValue::from(Value::Object(info)))
}

/// Collapse Yahoo's `{raw, fmt, longFmt}` number wrappers to the raw value.
fn unwrap_raw(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(raw) = map.remove("raw") {
                return raw;
            }
            if map.is_empty() {
                return Value::Null;
            }
            Value::Object(
                map.into_iter()
                    .filter(|(k, _)| k != "maxAge")
                    .map(|(k, v)| (k, unwrap_raw(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_raw).collect()),
        other => other,
    }
}

/// Build the income-statement table: one row per line item (index column
/// `index`), one column per fiscal period end, newest first.
fn financials_table(body: &Value) -> Result<Table, DataError> {
    let results = body
        .get("timeseries")
        .and_then(|t| t.get("result"))
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::ResponseFormatChanged("missing timeseries result".into()))?;

    let mut items: BTreeMap<String, HashMap<NaiveDate, f64>> = BTreeMap::new();
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();

    for result in results {
        let Some(type_name) = result
            .get("meta")
            .and_then(|m| m.get("type"))
            .and_then(Value::as_array)
            .and_then(|t| t.first())
            .and_then(Value::as_str)
        else {
            continue;
        };
        let Some(points) = result.get(type_name).and_then(Value::as_array) else {
            continue;
        };

        let item = type_name.strip_prefix("annual").unwrap_or(type_name).to_string();
        for point in points {
            let date = point
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            let value = point
                .get("reportedValue")
                .and_then(|v| v.get("raw"))
                .and_then(Value::as_f64);
            if let (Some(date), Some(value)) = (date, value) {
                dates.insert(date);
                items.entry(item.clone()).or_default().insert(date, value);
            }
        }
    }

    let map_err = |e: PolarsError| DataError::ResponseFormatChanged(format!("financials table: {e}"));

    let names: Vec<String> = items.keys().cloned().collect();
    let mut columns = vec![Column::new("index".into(), names)];
    for date in dates.iter().rev() {
        let values: Vec<Option<f64>> = items.values().map(|v| v.get(date).copied()).collect();
        let label = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| iso8601(&dt.and_utc()))
            .unwrap_or_else(|| date.to_string());
        columns.push(Column::new(label.into(), values));
    }

    let frame = DataFrame::new(columns).map_err(map_err)?;
    Ok(Table::new(frame).with_index("index"))
}

/// Sort `(epoch seconds, value)` points by time into a keyed series.
fn keyed_series(name: &str, mut points: Vec<(i64, f64)>) -> IndexedSeries {
    points.sort_by_key(|(ts, _)| *ts);
    let mut series = IndexedSeries::new(name);
    for (ts, value) in points {
        if let Some(t) = DateTime::<Utc>::from_timestamp(ts, 0) {
            series.push(IndexKey::Time(t), ProviderValue::float(value));
        }
    }
    series
}
