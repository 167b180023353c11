//! In-memory document store.

use super::{DocumentStore, StoreError};
use idxsync_core::shape::TICKER_FIELD;
use idxsync_core::Record;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Document store held in process memory, one `Vec` per collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of collections that hold at least one document.
    pub fn collection_names(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<Record>>> {
        // A panic while holding the lock cannot leave a collection half-written.
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn has_ticker(doc: &Record, ticker: &str) -> bool {
    doc.get(TICKER_FIELD).and_then(Value::as_str) == Some(ticker)
}

impl DocumentStore for MemoryStore {
    fn upsert_merge(
        &self,
        collection: &str,
        ticker: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();

        match docs.iter_mut().find(|d| has_ticker(d, ticker)) {
            Some(existing) => {
                for (key, value) in record {
                    existing.insert(key.clone(), value.clone());
                }
            }
            None => {
                let mut created = Record::with_capacity(record.len() + 1);
                created.insert(TICKER_FIELD.to_string(), Value::String(ticker.to_string()));
                for (key, value) in record {
                    created.insert(key.clone(), value.clone());
                }
                docs.push(created);
            }
        }
        Ok(())
    }

    fn replace_for_ticker(
        &self,
        collection: &str,
        ticker: &str,
        records: &[Record],
    ) -> Result<usize, StoreError> {
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.retain(|d| !has_ticker(d, ticker));
        docs.extend(records.iter().cloned());
        Ok(records.len())
    }

    fn find_by_ticker(&self, collection: &str, ticker: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .lock()
            .get(collection)
            .map(|docs| docs.iter().filter(|d| has_ticker(d, ticker)).cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.lock().get(collection).map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn upsert_creates_then_merges() {
        let store = MemoryStore::new();
        store
            .upsert_merge("stocks", "BBCA", &record(json!({"ticker": "BBCA", "a": 1, "b": 2})))
            .unwrap();
        store
            .upsert_merge("stocks", "BBCA", &record(json!({"ticker": "BBCA", "b": 3})))
            .unwrap();

        let docs = store.find_by_ticker("stocks", "BBCA").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(Value::Object(docs[0].clone()), json!({"ticker": "BBCA", "a": 1, "b": 3}));
    }

    #[test]
    fn replace_only_touches_one_ticker() {
        let store = MemoryStore::new();
        store
            .replace_for_ticker("news", "BBCA", &[record(json!({"ticker": "BBCA", "n": 1}))])
            .unwrap();
        store
            .replace_for_ticker("news", "TLKM", &[record(json!({"ticker": "TLKM", "n": 1}))])
            .unwrap();
        store
            .replace_for_ticker(
                "news",
                "BBCA",
                &[
                    record(json!({"ticker": "BBCA", "n": 2})),
                    record(json!({"ticker": "BBCA", "n": 3})),
                ],
            )
            .unwrap();

        assert_eq!(store.count("news").unwrap(), 3);
        assert_eq!(store.find_by_ticker("news", "TLKM").unwrap().len(), 1);
        let bbca: Vec<i64> = store
            .find_by_ticker("news", "BBCA")
            .unwrap()
            .iter()
            .map(|d| d["n"].as_i64().unwrap())
            .collect();
        assert_eq!(bbca, vec![2, 3]);
    }

    #[test]
    fn unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.count("splits").unwrap(), 0);
        assert!(store.find_by_ticker("splits", "BBCA").unwrap().is_empty());
        assert!(store.collection_names().is_empty());
    }
}
