//! Record shaper: imposes the stored document shape on sanitized JSON.
//!
//! Every stored document carries a `ticker` field, exactly once, as its first
//! key. Keyed series (dividends, splits) are exploded into one flat record
//! per date instead of being tagged as a single object.

use crate::category::Record;
use serde_json::{json, Value};

/// Field holding the clean ticker in every stored document.
pub const TICKER_FIELD: &str = "ticker";

/// Tag `value` with `ticker`.
///
/// Objects get `ticker` first, followed by their remaining keys in order
/// (a pre-existing `ticker` is replaced). Arrays are shaped element-wise.
/// Anything else is returned unchanged.
pub fn shape(value: Value, ticker: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(shape_record(map, ticker)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| shape(v, ticker)).collect()),
        other => other,
    }
}

/// Rebuild `record` with `ticker` as its first field.
pub fn shape_record(record: Record, ticker: &str) -> Record {
    let mut shaped = Record::with_capacity(record.len() + 1);
    shaped.insert(TICKER_FIELD.to_string(), Value::String(ticker.to_string()));
    for (key, value) in record {
        if key != TICKER_FIELD {
            shaped.insert(key, value);
        }
    }
    shaped
}

/// Explode a sanitized keyed series into `{ticker, date, <value_field>}` records.
///
/// `{"2024-01-01": 5.0, "2024-02-01": 2.0}` becomes two records, one per key,
/// in key order. An array (a provider that already returns rows) is shaped
/// element-wise; any other value yields no records.
pub fn explode_keyed_series(value: Value, ticker: &str, value_field: &str) -> Vec<Record> {
    match value {
        Value::Object(points) => points
            .into_iter()
            .map(|(date, v)| {
                let mut record = Record::with_capacity(3);
                record.insert(TICKER_FIELD.to_string(), Value::String(ticker.to_string()));
                record.insert("date".to_string(), Value::String(date));
                record.insert(value_field.to_string(), v);
                record
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(shape_record(map, ticker)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Project a news article into the fixed stored form.
///
/// Missing fields default to empty values. `thumbnail` is the URL of the
/// first listed resolution, or `""` when the article has none.
pub fn project_article(article: &Value, ticker: &str) -> Record {
    let text = |key: &str| {
        article
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let publish_time = article
        .get("providerPublishTime")
        .filter(|v| v.is_number())
        .cloned()
        .unwrap_or_else(|| json!(0));

    let related = article
        .get("relatedTickers")
        .filter(|v| v.is_array())
        .cloned()
        .unwrap_or_else(|| json!([]));

    let mut record = Record::with_capacity(8);
    record.insert(TICKER_FIELD.to_string(), json!(ticker));
    record.insert("title".to_string(), json!(text("title")));
    record.insert("publisher".to_string(), json!(text("publisher")));
    record.insert("link".to_string(), json!(text("link")));
    record.insert("publishTime".to_string(), publish_time);
    record.insert("type".to_string(), json!(text("type")));
    record.insert("relatedTickers".to_string(), related);
    record.insert("thumbnail".to_string(), json!(thumbnail_url(article)));
    record
}

fn thumbnail_url(article: &Value) -> &str {
    article
        .get("thumbnail")
        .and_then(|t| t.get("resolutions"))
        .and_then(Value::as_array)
        .and_then(|res| res.first())
        .and_then(|first| first.get("url"))
        .and_then(Value::as_str)
        .unwrap_or("")
}
