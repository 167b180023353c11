//! Data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over market-data sources so the
//! fetch orchestrator can be driven by Yahoo Finance in production and by a
//! scripted provider in tests.

use crate::value::ProviderValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured error types for provider calls.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("invalid {what}: '{value}'")]
    InvalidParameter { what: &'static str, value: String },

    #[error("data error: {0}")]
    Other(String),
}

/// Bar spacing of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    Daily,
    Hourly,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Hourly => "1h",
        }
    }
}

/// Lookback window of a price series, in the provider's range vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let period = match s.trim() {
            "1mo" => Period::OneMonth,
            "3mo" => Period::ThreeMonths,
            "6mo" => Period::SixMonths,
            "1y" => Period::OneYear,
            "2y" => Period::TwoYears,
            "5y" => Period::FiveYears,
            "10y" => Period::TenYears,
            "ytd" => Period::YearToDate,
            "max" => Period::Max,
            other => {
                return Err(DataError::InvalidParameter {
                    what: "period",
                    value: other.to_string(),
                })
            }
        };
        Ok(period)
    }
}

/// Price-series request: spacing plus lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRequest {
    pub interval: Interval,
    pub period: Period,
}

impl HistoryRequest {
    pub fn daily(period: Period) -> Self {
        Self {
            interval: Interval::Daily,
            period,
        }
    }

    pub fn hourly(period: Period) -> Self {
        Self {
            interval: Interval::Hourly,
            period,
        }
    }
}

/// A source of per-ticker market data.
///
/// Every method takes the provider-side (suffixed) symbol and is independent
/// of the others: a failure in one call says nothing about the rest.
pub trait MarketDataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Quote metadata (company profile, price summary, key statistics).
    fn quote_info(&self, symbol: &str) -> Result<ProviderValue, DataError>;

    /// OHLCV price series as a table indexed by bar time.
    fn price_history(&self, symbol: &str, request: HistoryRequest)
        -> Result<ProviderValue, DataError>;

    /// Financial-statement line items as a table indexed by line item.
    fn financials(&self, symbol: &str) -> Result<ProviderValue, DataError>;

    /// Cash dividends keyed by ex-date.
    fn dividends(&self, symbol: &str) -> Result<ProviderValue, DataError>;

    /// Split ratios keyed by split date.
    fn splits(&self, symbol: &str) -> Result<ProviderValue, DataError>;

    /// Raw news articles, as the provider returns them.
    fn news(&self, symbol: &str) -> Result<Vec<Value>, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_provider_ranges() {
        assert_eq!("1y".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!(" max ".parse::<Period>().unwrap(), Period::Max);
        assert_eq!(Period::default(), Period::OneYear);
        for p in [Period::OneMonth, Period::YearToDate, Period::TenYears] {
            assert_eq!(p.as_str().parse::<Period>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_period_is_rejected() {
        let err = "1w".parse::<Period>().unwrap_err();
        assert!(matches!(err, DataError::InvalidParameter { what: "period", .. }));
        assert_eq!(err.to_string(), "invalid period: '1w'");
    }

    #[test]
    fn history_request_intervals() {
        assert_eq!(HistoryRequest::daily(Period::OneYear).interval.as_str(), "1d");
        assert_eq!(HistoryRequest::hourly(Period::OneYear).interval.as_str(), "1h");
    }
}
