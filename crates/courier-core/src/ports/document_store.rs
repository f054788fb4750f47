//! DocumentStore port - the external document database.
//!
//! Documents are JSON values grouped in named collections and addressed by a
//! store-assigned ULID key. The store offers:
//! - plain reads and creates,
//! - a per-document read-modify-write transaction,
//! - equality / membership queries.
//!
//! # Transaction contract
//! `run_transaction` hands the transaction function a consistent snapshot. If
//! another writer commits to the same document before this transaction does,
//! the store re-runs the function on the new snapshot (bounded attempts).
//! Consequently at most one of several racing transactions that read the same
//! snapshot can commit; the others see the winner's write on their retry.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use ulid::Ulid;

/// A stored document with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: Ulid,
    pub data: Value,
}

/// Query predicate on a top-level field. Filters in one query are AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(field.into(), values)
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => data.get(field) == Some(expected),
            Filter::In(field, candidates) => data
                .get(field)
                .is_some_and(|actual| candidates.contains(actual)),
        }
    }
}

/// What a transaction function decided after looking at the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum TxStep<A> {
    /// Replace the document with this value and commit.
    Write(Value),
    /// Leave the document untouched and report `A` to the caller.
    Abort(A),
}

/// Result of a finished transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome<A> {
    Committed(Value),
    Aborted(A),
    /// The document does not exist; the function was never called.
    Missing,
}

/// Transaction function. May be called more than once (once per attempt).
pub type TxFn<A> = Box<dyn FnMut(&Value) -> TxStep<A> + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("transaction on {collection}/{key} gave up after {attempts} contended attempts")]
    Contention {
        collection: String,
        key: Ulid,
        attempts: u32,
    },

    #[error("document codec error: {0}")]
    Codec(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn get(&self, collection: &str, key: Ulid) -> Result<Option<Value>, StoreError>;

    /// Insert a new document under a freshly generated key.
    async fn create(&self, collection: &str, data: Value) -> Result<Ulid, StoreError>;

    async fn run_transaction<A>(
        &self,
        collection: &str,
        key: Ulid,
        f: TxFn<A>,
    ) -> Result<TxOutcome<A>, StoreError>
    where
        A: Send + 'static;

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError>;
}
