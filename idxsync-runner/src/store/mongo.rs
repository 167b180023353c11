//! MongoDB document store (blocking driver).

use super::{DocumentStore, StoreError};
use bson::{doc, Bson, Document};
use idxsync_core::shape::TICKER_FIELD;
use idxsync_core::Record;
use mongodb::options::UpdateOptions;
use mongodb::sync::{Client, Collection, Database};
use serde_json::Value;
use tracing::{debug, info};

/// One database on a MongoDB deployment.
pub struct MongoStore {
    db: Database,
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("db", &self.db.name())
            .finish()
    }
}

impl MongoStore {
    /// Connect and verify the deployment answers a `ping`.
    ///
    /// The driver connects lazily, so the ping is what surfaces an
    /// unreachable server at startup rather than on the first write.
    pub fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client =
            Client::with_uri_str(uri).map_err(|e| StoreError::Connection(e.to_string()))?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }, None)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!(db = db_name, "connected to MongoDB");
        Ok(Self { db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

fn write_err(collection: &str, e: mongodb::error::Error) -> StoreError {
    StoreError::Write {
        collection: collection.to_string(),
        message: e.to_string(),
    }
}

fn read_err(collection: &str, e: mongodb::error::Error) -> StoreError {
    StoreError::Read {
        collection: collection.to_string(),
        message: e.to_string(),
    }
}

fn to_document(record: &Record) -> Result<Document, StoreError> {
    bson::to_document(record).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Convert a stored document back to JSON, dropping the `_id` field.
fn to_record(mut document: Document) -> Option<Record> {
    document.remove("_id");
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(record) => Some(record),
        _ => None,
    }
}

impl DocumentStore for MongoStore {
    fn upsert_merge(
        &self,
        collection: &str,
        ticker: &str,
        record: &Record,
    ) -> Result<(), StoreError> {
        let fields = to_document(record)?;
        let options = UpdateOptions::builder().upsert(true).build();
        let result = self
            .collection(collection)
            .update_one(doc! { TICKER_FIELD: ticker }, doc! { "$set": fields }, options)
            .map_err(|e| write_err(collection, e))?;
        debug!(
            collection,
            ticker,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "upserted document"
        );
        Ok(())
    }

    fn replace_for_ticker(
        &self,
        collection: &str,
        ticker: &str,
        records: &[Record],
    ) -> Result<usize, StoreError> {
        let documents = records
            .iter()
            .map(to_document)
            .collect::<Result<Vec<_>, _>>()?;

        let coll = self.collection(collection);
        let deleted = coll
            .delete_many(doc! { TICKER_FIELD: ticker }, None)
            .map_err(|e| write_err(collection, e))?;
        debug!(collection, ticker, deleted = deleted.deleted_count, "cleared ticker documents");

        if documents.is_empty() {
            return Ok(0);
        }
        let inserted = coll
            .insert_many(documents, None)
            .map_err(|e| write_err(collection, e))?;
        Ok(inserted.inserted_ids.len())
    }

    fn find_by_ticker(&self, collection: &str, ticker: &str) -> Result<Vec<Record>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(doc! { TICKER_FIELD: ticker }, None)
            .map_err(|e| read_err(collection, e))?;

        let mut records = Vec::new();
        for document in cursor {
            let document = document.map_err(|e| read_err(collection, e))?;
            records.extend(to_record(document));
        }
        Ok(records)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let n = self
            .collection(collection)
            .count_documents(None, None)
            .map_err(|e| read_err(collection, e))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_convert_to_documents_in_field_order() {
        let record = json!({"ticker": "BBCA", "Date": "2024-01-02T00:00:00.000Z", "Close": 9400.0, "Volume": 1200})
            .as_object()
            .cloned()
            .unwrap();
        let document = to_document(&record).unwrap();
        let keys: Vec<&str> = document.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ticker", "Date", "Close", "Volume"]);
        assert_eq!(document.get_str("ticker").unwrap(), "BBCA");
    }

    #[test]
    fn stored_documents_read_back_without_id() {
        let document = doc! {
            "_id": bson::oid::ObjectId::new(),
            "ticker": "BBCA",
            "dividend": 5.0,
            "info": { "sector": "Financial Services" },
        };
        let record = to_record(document).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"ticker": "BBCA", "dividend": 5.0, "info": {"sector": "Financial Services"}})
        );
    }

    #[test]
    fn unrepresentable_numbers_are_encode_errors() {
        let record = json!({"ticker": "BBCA", "big": u64::MAX}).as_object().cloned().unwrap();
        assert!(matches!(to_document(&record), Err(StoreError::Encode(_))));
    }
}
