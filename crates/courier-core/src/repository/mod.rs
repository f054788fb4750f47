//! DeliveryRepository - the only component that touches delivery documents.
//!
//! # Transactions
//! Every state change goes through [`DeliveryRepository::with_transaction`],
//! which runs on the store's optimistic transaction: the caller's function
//! sees a decoded snapshot and may be re-run if another writer commits first.
//! The transaction is spawned onto its own task, so dropping the caller's
//! future (or hitting `operation_timeout`) never interrupts it mid-flight.
//!
//! # Failure mapping
//! - document absent -> `NotFound`
//! - precondition failed inside the transaction -> `Conflict`
//! - store down, timeout, contention exhausted, undecodable document ->
//!   `RepositoryUnavailable`
//!
//! Lists are lenient: an undecodable document is logged and left out.

mod counts;
mod record;

pub use counts::DeliveryCounts;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::domain::{
    ConflictReason, Delivery, DeliveryError, DeliveryId, DeliveryStatus, Missing, NewDelivery,
    StageChange, UserId,
};
use crate::ports::{Clock, DocumentStore, Filter, StoreError, TxFn, TxOutcome, TxStep};

pub const DELIVERIES: &str = "deliveries";

impl From<StoreError> for DeliveryError {
    fn from(err: StoreError) -> Self {
        DeliveryError::RepositoryUnavailable(err.to_string())
    }
}

/// Why a transaction function declined to write.
enum TxAbort {
    Conflict(ConflictReason),
    /// The snapshot could not be decoded, or the new value is not a valid
    /// successor of it.
    Corrupt(String),
}

pub struct DeliveryRepository<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    operation_timeout: Duration,
}

impl<S> Clone for DeliveryRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            operation_timeout: self.operation_timeout,
        }
    }
}

impl<S: DocumentStore> DeliveryRepository<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, operation_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            operation_timeout,
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    pub async fn get(&self, id: DeliveryId) -> Result<Delivery, DeliveryError> {
        let key = id.as_ulid();
        let data = self
            .bounded("get", self.store.get(DELIVERIES, key))
            .await?
            .ok_or(DeliveryError::NotFound(Missing::Delivery(id)))?;
        Ok(record::decode(key, &data)?)
    }

    /// Write a new delivery: status `pending`, no rider.
    pub async fn create_pending(&self, new: NewDelivery) -> Result<DeliveryId, DeliveryError> {
        let draft = Delivery::pending(DeliveryId::from_ulid(Ulid::nil()), new, self.clock.now());
        draft
            .check_invariants()
            .map_err(DeliveryError::RepositoryUnavailable)?;
        let data = record::encode(&draft)?;

        let key = self
            .bounded("create", self.store.create(DELIVERIES, data))
            .await?;
        let id = DeliveryId::from_ulid(key);
        info!(delivery_id = %id, sender_id = %draft.sender_id(), "delivery created");
        Ok(id)
    }

    /// Run `f` as one optimistic read-modify-write on delivery `id`.
    ///
    /// `f` may run several times; it must decide from the snapshot alone.
    /// Returning `Err` aborts without writing and surfaces as `Conflict`.
    /// A returned record that is not a valid successor of the snapshot (see
    /// [`Delivery::check_successor`]) or breaks an invariant is not written;
    /// that surfaces as `RepositoryUnavailable`.
    pub async fn with_transaction<F>(&self, id: DeliveryId, mut f: F) -> Result<Delivery, DeliveryError>
    where
        F: FnMut(&Delivery) -> Result<Delivery, ConflictReason> + Send + 'static,
    {
        let key = id.as_ulid();
        let tx: TxFn<TxAbort> = Box::new(move |data: &Value| {
            let current = match record::decode(key, data) {
                Ok(current) => current,
                Err(err) => return TxStep::Abort(TxAbort::Corrupt(err.to_string())),
            };
            let next = match f(&current) {
                Ok(next) => next,
                Err(reason) => return TxStep::Abort(TxAbort::Conflict(reason)),
            };
            if let Err(violation) = current
                .check_successor(&next)
                .and_then(|()| next.check_invariants())
            {
                return TxStep::Abort(TxAbort::Corrupt(violation));
            }
            match record::encode(&next) {
                Ok(data) => TxStep::Write(data),
                Err(err) => TxStep::Abort(TxAbort::Corrupt(err.to_string())),
            }
        });

        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move { store.run_transaction(DELIVERIES, key, tx).await });
        let outcome = self
            .bounded("transaction", async move {
                handle.await.unwrap_or_else(|join_err| {
                    Err(StoreError::Unavailable(format!(
                        "transaction task failed: {join_err}"
                    )))
                })
            })
            .await?;

        match outcome {
            TxOutcome::Committed(data) => Ok(record::decode(key, &data)?),
            TxOutcome::Aborted(TxAbort::Conflict(reason)) => {
                debug!(delivery_id = %id, %reason, "transaction aborted");
                Err(DeliveryError::conflict(id, reason))
            }
            TxOutcome::Aborted(TxAbort::Corrupt(message)) => {
                warn!(delivery_id = %id, %message, "transaction refused to write");
                Err(DeliveryError::RepositoryUnavailable(message))
            }
            TxOutcome::Missing => Err(DeliveryError::NotFound(Missing::Delivery(id))),
        }
    }

    /// Apply `change` if the delivery is at `expected` and, when given,
    /// assigned to `required_rider`. The stage is checked before the rider.
    pub async fn transition(
        &self,
        id: DeliveryId,
        expected: DeliveryStatus,
        required_rider: Option<&UserId>,
        change: StageChange,
    ) -> Result<Delivery, DeliveryError> {
        let required_rider = required_rider.cloned();
        let updated = self
            .with_transaction(id, move |current| {
                if current.status() != expected {
                    return Err(match expected {
                        DeliveryStatus::Pending => ConflictReason::NotPending,
                        _ => ConflictReason::WrongStage {
                            expected,
                            actual: current.status(),
                        },
                    });
                }
                if let Some(rider) = &required_rider {
                    if !current.is_assigned_to(rider) {
                        return Err(ConflictReason::WrongRider);
                    }
                }
                let mut next = current.clone();
                next.apply(change.clone())?;
                Ok(next)
            })
            .await?;

        info!(
            delivery_id = %id,
            status = %updated.status(),
            rider_id = ?updated.rider_id().map(UserId::as_str),
            "delivery transitioned"
        );
        Ok(updated)
    }

    /// Deliveries in `status`, oldest first.
    pub async fn list_by_status(&self, status: DeliveryStatus) -> Result<Vec<Delivery>, DeliveryError> {
        self.list(&[Filter::eq("status", status.as_str())]).await
    }

    /// Deliveries the rider currently holds (accepted or picked up).
    pub async fn list_active_for_rider(&self, rider_id: &UserId) -> Result<Vec<Delivery>, DeliveryError> {
        let active = DeliveryStatus::ALL
            .into_iter()
            .filter(|status| status.is_active())
            .map(|status| json!(status.as_str()))
            .collect();
        self.list(&[
            Filter::eq("rider_id", rider_id.as_str()),
            Filter::any_of("status", active),
        ])
        .await
    }

    pub async fn list_sent_by(&self, user_id: &UserId) -> Result<Vec<Delivery>, DeliveryError> {
        self.list(&[Filter::eq("sender_id", user_id.as_str())]).await
    }

    pub async fn list_received_by(&self, user_id: &UserId) -> Result<Vec<Delivery>, DeliveryError> {
        self.list(&[Filter::eq("receiver_id", user_id.as_str())]).await
    }

    pub async fn counts_by_status(&self) -> Result<DeliveryCounts, DeliveryError> {
        let mut counts = DeliveryCounts::default();
        for delivery in self.list(&[]).await? {
            counts.record(delivery.status());
        }
        Ok(counts)
    }

    async fn list(&self, filters: &[Filter]) -> Result<Vec<Delivery>, DeliveryError> {
        let documents = self
            .bounded("query", self.store.query(DELIVERIES, filters))
            .await?;
        let mut deliveries: Vec<Delivery> = documents
            .iter()
            .filter_map(|doc| match record::decode(doc.key, &doc.data) {
                Ok(delivery) => Some(delivery),
                Err(err) => {
                    warn!(key = %doc.key, error = %err, "skipping undecodable delivery document");
                    None
                }
            })
            .collect();
        deliveries.sort_by_key(|delivery| (delivery.created_at(), delivery.id()));
        Ok(deliveries)
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, DeliveryError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(result) => result.map_err(|err| {
                warn!(operation, error = %err, "store call failed");
                DeliveryError::from(err)
            }),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = u64::try_from(self.operation_timeout.as_millis()).unwrap_or(u64::MAX),
                    "store call timed out"
                );
                Err(DeliveryError::RepositoryUnavailable(format!(
                    "{operation} timed out after {:?}",
                    self.operation_timeout
                )))
            }
        }
    }
}
