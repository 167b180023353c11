//! Provider-native values.
//!
//! Everything a data provider hands back is expressed as a [`ProviderValue`]
//! before it is sanitized into plain JSON. Each shape the provider can produce
//! has its own variant, so the sanitizer converts by matching rather than by
//! probing what a value looks like.

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A value as returned by a data provider.
#[derive(Debug, Clone)]
pub enum ProviderValue {
    /// Tabular frame with an optional index column.
    Table(Table),
    /// One-dimensional series keyed by an index.
    IndexedSeries(IndexedSeries),
    /// Ordered key/value pairs.
    Mapping(Vec<(String, ProviderValue)>),
    Sequence(Vec<ProviderValue>),
    Scalar(Scalar),
    /// A point in time.
    TimeValue(DateTime<Utc>),
    /// The provider's "not a value" sentinel.
    Missing,
    /// An object that knows how to convert itself into a provider value.
    Structured(Arc<dyn Structured>),
    /// Already plain JSON. Passed through untouched.
    Json(Value),
}

/// A frame whose `index` column (if any) identifies rows. Without one, sanitized
/// rows are numbered by position under an `index` field.
#[derive(Debug, Clone)]
pub struct Table {
    pub frame: DataFrame,
    pub index: Option<String>,
}

impl Table {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame, index: None }
    }

    /// Mark `column` as the row index. Sanitized rows carry it as their first field.
    pub fn with_index(mut self, column: impl Into<String>) -> Self {
        self.index = Some(column.into());
        self
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// A keyed series, e.g. dividend amount by ex-date.
#[derive(Debug, Clone, Default)]
pub struct IndexedSeries {
    pub name: String,
    pub points: Vec<(IndexKey, ProviderValue)>,
}

impl IndexedSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, key: IndexKey, value: ProviderValue) {
        self.points.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Index label of a series point.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    Time(DateTime<Utc>),
    Label(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

/// Conversion hook for provider objects that are not one of the built-in shapes.
pub trait Structured: fmt::Debug + Send + Sync {
    fn to_structured(&self) -> ProviderValue;
}

impl ProviderValue {
    /// True when the value carries no data: an empty frame, series, mapping or
    /// sequence, or the missing sentinel.
    pub fn is_empty(&self) -> bool {
        match self {
            ProviderValue::Table(t) => t.height() == 0,
            ProviderValue::IndexedSeries(s) => s.is_empty(),
            ProviderValue::Mapping(m) => m.is_empty(),
            ProviderValue::Sequence(s) => s.is_empty(),
            ProviderValue::Missing => true,
            ProviderValue::Json(v) => match v {
                Value::Null => true,
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            },
            ProviderValue::Scalar(_)
            | ProviderValue::TimeValue(_)
            | ProviderValue::Structured(_) => false,
        }
    }

    pub fn float(v: f64) -> Self {
        ProviderValue::Scalar(Scalar::Float(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        ProviderValue::Scalar(Scalar::Str(v.into()))
    }
}

/// Tag plain JSON with its shape. `null` becomes [`ProviderValue::Missing`].
impl From<Value> for ProviderValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ProviderValue::Missing,
            Value::Bool(b) => ProviderValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ProviderValue::Scalar(Scalar::Int(i))
                } else if let Some(u) = n.as_u64() {
                    ProviderValue::Scalar(Scalar::UInt(u))
                } else {
                    ProviderValue::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::String(s) => ProviderValue::Scalar(Scalar::Str(s)),
            Value::Array(items) => {
                ProviderValue::Sequence(items.into_iter().map(ProviderValue::from).collect())
            }
            Value::Object(map) => ProviderValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ProviderValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for ProviderValue {
    fn from(v: f64) -> Self {
        ProviderValue::float(v)
    }
}

impl From<DateTime<Utc>> for ProviderValue {
    fn from(t: DateTime<Utc>) -> Self {
        ProviderValue::TimeValue(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_null_is_missing() {
        assert!(matches!(ProviderValue::from(json!(null)), ProviderValue::Missing));
    }

    #[test]
    fn json_object_keeps_key_order() {
        let v = ProviderValue::from(json!({"z": 1, "a": 2}));
        match v {
            ProviderValue::Mapping(pairs) => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["z", "a"]);
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn numbers_keep_their_kind() {
        assert!(matches!(
            ProviderValue::from(json!(-3)),
            ProviderValue::Scalar(Scalar::Int(-3))
        ));
        assert!(matches!(
            ProviderValue::from(json!(u64::MAX)),
            ProviderValue::Scalar(Scalar::UInt(u64::MAX))
        ));
        assert!(matches!(
            ProviderValue::from(json!(1.5)),
            ProviderValue::Scalar(Scalar::Float(f)) if f == 1.5
        ));
    }

    #[test]
    fn emptiness() {
        assert!(ProviderValue::Missing.is_empty());
        assert!(ProviderValue::Sequence(vec![]).is_empty());
        assert!(ProviderValue::IndexedSeries(IndexedSeries::new("Dividends")).is_empty());
        assert!(ProviderValue::Table(Table::new(DataFrame::empty())).is_empty());
        assert!(!ProviderValue::float(0.0).is_empty());
        assert!(ProviderValue::Json(json!([])).is_empty());
    }
}
