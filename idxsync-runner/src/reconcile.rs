//! Storage reconciler: applies each category's write policy for one ticker.
//!
//! - `stocks` (upsert-by-key): merge-set every field of the single record
//!   onto the ticker's document, creating it if absent.
//! - list categories (replace-all-for-ticker): delete every document for the
//!   ticker, then insert the new records.
//!
//! Categories absent from the result set, or present but empty, are not
//! touched. A failure in one category never stops the others.

use crate::store::{DocumentStore, StoreError};
use idxsync_core::category::{Category, CategoryResult, ResultSet, WritePolicy};
use idxsync_core::shape::shape_record;
use thiserror::Error;
use tracing::{error, info};

/// Why a category could not be written.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{category}: expected a {expected} result")]
    ShapeMismatch {
        category: Category,
        expected: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one category's write.
#[derive(Debug)]
pub enum WriteOutcome {
    Upserted,
    Replaced(usize),
    Skipped,
    Failed(ReconcileError),
}

/// Per-category outcomes of one reconcile pass, in category order.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub outcomes: Vec<(Category, WriteOutcome)>,
}

impl ReconcileReport {
    /// Number of categories that were written.
    pub fn stored(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, WriteOutcome::Upserted | WriteOutcome::Replaced(_)))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (Category, &ReconcileError)> {
        self.outcomes.iter().filter_map(|(c, o)| match o {
            WriteOutcome::Failed(e) => Some((*c, e)),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn outcome(&self, category: Category) -> Option<&WriteOutcome> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, o)| o)
    }
}

/// Persist `results` for the clean ticker `ticker`.
pub fn reconcile(store: &dyn DocumentStore, ticker: &str, results: &ResultSet) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for category in Category::ALL {
        let outcome = match results.get(category) {
            Some(result) if !result.is_empty() => match write_category(store, category, ticker, result)
            {
                Ok(outcome) => {
                    info!(
                        ticker,
                        %category,
                        collection = category.collection(),
                        count = result.len(),
                        "stored category"
                    );
                    outcome
                }
                Err(e) => {
                    error!(ticker, %category, error = %e, "error storing category");
                    WriteOutcome::Failed(e)
                }
            },
            _ => WriteOutcome::Skipped,
        };
        report.outcomes.push((category, outcome));
    }

    report
}

fn write_category(
    store: &dyn DocumentStore,
    category: Category,
    ticker: &str,
    result: &CategoryResult,
) -> Result<WriteOutcome, ReconcileError> {
    let collection = category.collection();
    match (category.write_policy(), result) {
        (WritePolicy::UpsertByKey, CategoryResult::Single(record)) => {
            let record = shape_record(record.clone(), ticker);
            store.upsert_merge(collection, ticker, &record)?;
            Ok(WriteOutcome::Upserted)
        }
        (WritePolicy::ReplaceAllForTicker, CategoryResult::List(records)) => {
            let shaped: Vec<_> = records
                .iter()
                .map(|r| shape_record(r.clone(), ticker))
                .collect();
            let inserted = store.replace_for_ticker(collection, ticker, &shaped)?;
            Ok(WriteOutcome::Replaced(inserted))
        }
        (WritePolicy::UpsertByKey, _) => Err(ReconcileError::ShapeMismatch {
            category,
            expected: "single-record",
        }),
        (WritePolicy::ReplaceAllForTicker, _) => Err(ReconcileError::ShapeMismatch {
            category,
            expected: "record-list",
        }),
    }
}
