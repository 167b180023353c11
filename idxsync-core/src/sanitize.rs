//! Sanitizer: provider values to plain JSON.
//!
//! Conversion rules, one per [`ProviderValue`] variant:
//! - `Table` → array of row objects, index column first; a table with no
//!   index column gets its row position as a leading `index` field
//! - `IndexedSeries` → object from rendered index key to cell value
//! - `Mapping` / `Sequence` → same shape, recursively sanitized
//! - `TimeValue` and date/datetime cells → ISO-8601 strings
//! - `Missing`, null cells and non-finite floats → `null`
//! - `Structured` → its structured form, recursively sanitized
//! - `Json` → unchanged
//!
//! Sanitizing never fails. A frame column of a type with no JSON mapping is
//! rendered through its display form.

use crate::value::{IndexKey, IndexedSeries, ProviderValue, Scalar, Table};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use polars::prelude::*;
use serde_json::{Map, Value};

/// Convert a provider value into an equivalent JSON value.
pub fn sanitize(value: &ProviderValue) -> Value {
    match value {
        ProviderValue::Table(table) => sanitize_table(table),
        ProviderValue::IndexedSeries(series) => sanitize_series(series),
        ProviderValue::Mapping(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.clone(), sanitize(v)))
                .collect(),
        ),
        ProviderValue::Sequence(items) => Value::Array(items.iter().map(sanitize).collect()),
        ProviderValue::Scalar(scalar) => sanitize_scalar(scalar),
        ProviderValue::TimeValue(t) => Value::String(iso8601(t)),
        ProviderValue::Missing => Value::Null,
        ProviderValue::Structured(obj) => sanitize(&obj.to_structured()),
        ProviderValue::Json(v) => v.clone(),
    }
}

/// ISO-8601 rendering used for every timestamp: millisecond precision, UTC `Z`.
pub fn iso8601(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// JSON number for a float, or `null` when it is NaN or infinite.
pub fn finite_or_null(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn sanitize_scalar(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::from(*i),
        Scalar::UInt(u) => Value::from(*u),
        Scalar::Float(f) => finite_or_null(*f),
        Scalar::Str(s) => Value::String(s.clone()),
    }
}

fn render_key(key: &IndexKey) -> String {
    match key {
        IndexKey::Time(t) => iso8601(t),
        IndexKey::Label(s) => s.clone(),
    }
}

fn sanitize_series(series: &IndexedSeries) -> Value {
    Value::Object(
        series
            .points
            .iter()
            .map(|(k, v)| (render_key(k), sanitize(v)))
            .collect(),
    )
}

const POSITIONAL_INDEX: &str = "index";

fn sanitize_table(table: &Table) -> Value {
    let mut columns: Vec<&Column> = table.frame.get_columns().iter().collect();

    let indexed = match &table.index {
        Some(index) => match columns.iter().position(|c| c.name().as_str() == index.as_str()) {
            Some(pos) => {
                let col = columns.remove(pos);
                columns.insert(0, col);
                true
            }
            None => false,
        },
        None => false,
    };
    let positional = !indexed && !columns.iter().any(|c| c.name().as_str() == POSITIONAL_INDEX);

    let rendered: Vec<(String, Vec<Value>)> = columns
        .iter()
        .map(|c| (c.name().to_string(), column_values(c)))
        .collect();

    let rows = (0..table.frame.height())
        .map(|i| {
            let mut row = Map::with_capacity(rendered.len() + 1);
            if positional {
                row.insert(POSITIONAL_INDEX.to_string(), Value::from(i));
            }
            for (name, values) in &rendered {
                row.insert(name.clone(), values.get(i).cloned().unwrap_or(Value::Null));
            }
            Value::Object(row)
        })
        .collect();

    Value::Array(rows)
}

/// Render every cell of a column as JSON.
fn column_values(col: &Column) -> Vec<Value> {
    let rendered: PolarsResult<Vec<Value>> = match col.dtype() {
        DataType::Boolean => col
            .bool()
            .map(|ca| ca.into_iter().map(|v| v.map_or(Value::Null, Value::Bool)).collect()),
        DataType::String => col.str().map(|ca| {
            ca.into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
                .collect()
        }),
        DataType::Date => col.cast(&DataType::Int32).and_then(|c| {
            c.i32().map(|ca| {
                ca.into_iter()
                    .map(|v| v.and_then(days_to_iso).map_or(Value::Null, Value::String))
                    .collect()
            })
        }),
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            col.cast(&DataType::Int64).and_then(|c| {
                c.i64().map(|ca| {
                    ca.into_iter()
                        .map(|v| {
                            v.and_then(|raw| epoch_to_utc(raw, unit))
                                .map_or(Value::Null, |t| Value::String(iso8601(&t)))
                        })
                        .collect()
                })
            })
        }
        dt if dt.is_integer() => col.cast(&DataType::Int64).and_then(|c| {
            c.i64()
                .map(|ca| ca.into_iter().map(|v| v.map_or(Value::Null, Value::from)).collect())
        }),
        dt if dt.is_float() => col.cast(&DataType::Float64).and_then(|c| {
            c.f64()
                .map(|ca| ca.into_iter().map(|v| v.map_or(Value::Null, finite_or_null)).collect())
        }),
        _ => Ok(display_values(col)),
    };

    rendered.unwrap_or_else(|_| display_values(col))
}

fn display_values(col: &Column) -> Vec<Value> {
    (0..col.len())
        .map(|i| match col.get(i) {
            Ok(av) if !av.is_null() => Value::String(av.to_string()),
            _ => Value::Null,
        })
        .collect()
}

fn days_to_iso(days: i32) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let date = epoch.checked_add_signed(chrono::Duration::days(days as i64))?;
    let t = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(iso8601(&t))
}

fn epoch_to_utc(raw: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let (per_sec, nanos_per_tick) = match unit {
        TimeUnit::Nanoseconds => (1_000_000_000, 1),
        TimeUnit::Microseconds => (1_000_000, 1_000),
        TimeUnit::Milliseconds => (1_000, 1_000_000),
    };
    let secs = raw.div_euclid(per_sec);
    let nanos = raw.rem_euclid(per_sec) * nanos_per_tick;
    DateTime::from_timestamp(secs, nanos as u32)
}
