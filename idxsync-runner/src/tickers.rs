//! Ticker list loading.
//!
//! The list is a semicolon-delimited CSV with a `Code` header column; other
//! columns are ignored. Blank codes are skipped. Rows may carry more or
//! fewer fields than the header (trailing `;` from spreadsheet exports).

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

const DELIMITER: u8 = b';';

/// Errors from reading a ticker list.
#[derive(Debug, Error)]
pub enum TickerListError {
    #[error("cannot open ticker list {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ticker list: {0}")]
    Malformed(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    #[serde(rename = "Code")]
    code: String,
}

/// Read raw ticker codes from any reader.
pub fn read_tickers<R: Read>(reader: R) -> Result<Vec<String>, TickerListError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut tickers = Vec::new();
    for row in rdr.deserialize::<TickerRow>() {
        let row = row?;
        if !row.code.is_empty() {
            tickers.push(row.code);
        }
    }
    Ok(tickers)
}

/// Read raw ticker codes from a file.
pub fn read_ticker_file(path: &Path) -> Result<Vec<String>, TickerListError> {
    let file = std::fs::File::open(path).map_err(|source| TickerListError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_tickers(file)
}

/// Load the ticker list, logging and returning an empty list on any error.
pub fn load_tickers(path: &Path) -> Vec<String> {
    info!(path = %path.display(), "extracting tickers");
    match read_ticker_file(path) {
        Ok(tickers) => {
            info!(count = tickers.len(), "extracted tickers");
            tickers
        }
        Err(e) => {
            error!(error = %e, "error extracting tickers");
            Vec::new()
        }
    }
}
