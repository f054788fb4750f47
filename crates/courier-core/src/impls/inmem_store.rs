//! InMemoryDocumentStore - development/test implementation of `DocumentStore`.
//!
//! Concurrency model mirrors a hosted document database with optimistic
//! transactions:
//! - every document carries a version bumped on each write;
//! - a transaction reads a snapshot, runs the caller's function without
//!   holding the lock, then commits only if the version is unchanged;
//! - on a version mismatch the function is re-run against the fresh snapshot,
//!   up to `max_attempts` times.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::ports::{
    Document, DocumentStore, Filter, IdGenerator, StoreError, TxFn, TxOutcome, TxStep,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    data: Value,
}

/// collection name -> key -> document
#[derive(Debug, Default)]
struct InMemoryStoreState {
    collections: HashMap<String, HashMap<Ulid, StoredDocument>>,
}

impl InMemoryStoreState {
    fn find(&self, collection: &str, key: Ulid) -> Option<&StoredDocument> {
        self.collections.get(collection)?.get(&key)
    }

    fn find_mut(&mut self, collection: &str, key: Ulid) -> Option<&mut StoredDocument> {
        self.collections.get_mut(collection)?.get_mut(&key)
    }
}

pub struct InMemoryDocumentStore {
    state: Arc<Mutex<InMemoryStoreState>>,
    ids: Arc<dyn IdGenerator>,
    max_attempts: u32,
    /// Simulated round trip between a transaction's read and its commit.
    latency: Option<Duration>,
    available: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new(ids: Arc<dyn IdGenerator>, max_attempts: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryStoreState::default())),
            ids,
            max_attempts: max_attempts.max(1),
            latency: None,
            available: AtomicBool::new(true),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fault injection: while unavailable every call fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        let state = self.state.lock().await;
        state.collections.get(collection).map_or(0, HashMap::len)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        }
    }

    async fn round_trip(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, key: Ulid) -> Result<Option<Value>, StoreError> {
        self.ensure_available()?;
        let state = self.state.lock().await;
        Ok(state.find(collection, key).map(|doc| doc.data.clone()))
    }

    async fn create(&self, collection: &str, data: Value) -> Result<Ulid, StoreError> {
        self.ensure_available()?;
        let key = self.ids.generate();
        let mut state = self.state.lock().await;
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key, StoredDocument { version: 1, data });
        debug!(collection, %key, "document created");
        Ok(key)
    }

    async fn run_transaction<A>(
        &self,
        collection: &str,
        key: Ulid,
        mut f: TxFn<A>,
    ) -> Result<TxOutcome<A>, StoreError>
    where
        A: Send + 'static,
    {
        for attempt in 1..=self.max_attempts {
            self.ensure_available()?;
            let (read_version, snapshot) = {
                let state = self.state.lock().await;
                match state.find(collection, key) {
                    Some(doc) => (doc.version, doc.data.clone()),
                    None => return Ok(TxOutcome::Missing),
                }
            };

            let data = match f(&snapshot) {
                TxStep::Write(data) => data,
                TxStep::Abort(reason) => return Ok(TxOutcome::Aborted(reason)),
            };

            self.round_trip().await;
            self.ensure_available()?;

            let mut state = self.state.lock().await;
            let Some(doc) = state.find_mut(collection, key) else {
                return Ok(TxOutcome::Missing);
            };
            if doc.version != read_version {
                debug!(collection, %key, attempt, "transaction contended, retrying");
                continue;
            }
            doc.version += 1;
            doc.data = data.clone();
            return Ok(TxOutcome::Committed(data));
        }

        warn!(collection, %key, attempts = self.max_attempts, "transaction gave up");
        Err(StoreError::Contention {
            collection: collection.to_string(),
            key,
            attempts: self.max_attempts,
        })
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, StoreError> {
        self.ensure_available()?;
        let state = self.state.lock().await;
        let mut found: Vec<Document> = state
            .collections
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .filter(|(_, doc)| filters.iter().all(|filter| filter.matches(&doc.data)))
            .map(|(key, doc)| Document {
                key: *key,
                data: doc.data.clone(),
            })
            .collect();
        found.sort_by_key(|doc| doc.key);
        Ok(found)
    }
}
