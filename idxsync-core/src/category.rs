//! Data categories, per-category results, and the per-ticker result set.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A JSON document: field name to JSON value, insertion order preserved.
pub type Record = Map<String, Value>;

/// One of the seven kinds of data fetched per ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Stocks,
    Historical,
    Intraday,
    Financials,
    Dividends,
    Splits,
    News,
}

/// How a category's records are written to its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Find-or-create the single document for the ticker and merge-set fields.
    UpsertByKey,
    /// Delete every document for the ticker, then insert the new set.
    ReplaceAllForTicker,
}

impl Category {
    /// All categories, in fetch order.
    pub const ALL: [Category; 7] = [
        Category::Stocks,
        Category::Historical,
        Category::Intraday,
        Category::Financials,
        Category::Dividends,
        Category::Splits,
        Category::News,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Stocks => "stocks",
            Category::Historical => "historical",
            Category::Intraday => "intraday",
            Category::Financials => "financials",
            Category::Dividends => "dividends",
            Category::Splits => "splits",
            Category::News => "news",
        }
    }

    /// Document-store collection holding this category.
    pub fn collection(self) -> &'static str {
        self.name()
    }

    pub fn write_policy(self) -> WritePolicy {
        match self {
            Category::Stocks => WritePolicy::UpsertByKey,
            _ => WritePolicy::ReplaceAllForTicker,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Data produced for one category of one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryResult {
    /// A singleton document (stocks).
    Single(Record),
    /// An ordered list of documents (every other category).
    List(Vec<Record>),
}

impl CategoryResult {
    pub fn is_empty(&self) -> bool {
        match self {
            CategoryResult::Single(record) => record.is_empty(),
            CategoryResult::List(records) => records.is_empty(),
        }
    }

    /// Number of documents this result would write.
    pub fn len(&self) -> usize {
        match self {
            CategoryResult::Single(record) if record.is_empty() => 0,
            CategoryResult::Single(_) => 1,
            CategoryResult::List(records) => records.len(),
        }
    }
}

/// Per-ticker results keyed by category. Only categories that produced
/// data are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    entries: BTreeMap<Category, CategoryResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, result: CategoryResult) {
        self.entries.insert(category, result);
    }

    pub fn get(&self, category: Category) -> Option<&CategoryResult> {
        self.entries.get(&category)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.entries.contains_key(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryResult)> {
        self.entries.iter().map(|(c, r)| (*c, r))
    }

    pub fn categories(&self) -> Vec<Category> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
