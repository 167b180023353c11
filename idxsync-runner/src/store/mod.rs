//! Document store abstraction.
//!
//! Collections hold JSON records keyed by their `ticker` field. The
//! [`DocumentStore`] trait carries the two write primitives the reconciler
//! needs plus read-back for inspection. [`MongoStore`] is the production
//! backend; [`MemoryStore`] backs tests and dry runs.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use idxsync_core::Record;
use thiserror::Error;

/// Errors from document-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("write to '{collection}' failed: {message}")]
    Write { collection: String, message: String },

    #[error("read from '{collection}' failed: {message}")]
    Read { collection: String, message: String },

    #[error("record not storable: {0}")]
    Encode(String),
}

/// A ticker-keyed document store.
pub trait DocumentStore {
    /// Find-or-create the document whose `ticker` equals `ticker` and set
    /// every field of `record` on it. Fields not in `record` are untouched.
    fn upsert_merge(&self, collection: &str, ticker: &str, record: &Record)
        -> Result<(), StoreError>;

    /// Delete every document for `ticker`, then insert `records`.
    ///
    /// Returns the number of inserted documents. The two steps are not
    /// atomic: a failed insert leaves the ticker with no documents.
    fn replace_for_ticker(
        &self,
        collection: &str,
        ticker: &str,
        records: &[Record],
    ) -> Result<usize, StoreError>;

    /// All documents for `ticker`, in insertion order, without store-side ids.
    fn find_by_ticker(&self, collection: &str, ticker: &str) -> Result<Vec<Record>, StoreError>;

    /// Number of documents in `collection`.
    fn count(&self, collection: &str) -> Result<usize, StoreError>;
}
