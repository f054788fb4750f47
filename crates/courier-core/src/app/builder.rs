//! CourierBuilder - validates configuration and wires the in-memory system.
//!
//! Fail-fast: a bad configuration is rejected by `build()` with a
//! `BuildError`, before any store or engine exists.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::lifecycle::DeliveryLifecycle;
use super::session::SessionResolver;
use crate::config::CourierConfig;
use crate::impls::{InMemoryDocumentStore, InMemoryUserDirectory, StaticIdentityProvider};
use crate::ports::{Clock, EventSink, SystemClock, TracingEventSink, UlidGenerator};
use crate::repository::DeliveryRepository;

/// # Example
/// ```ignore
/// let courier = CourierBuilder::new(CourierConfig::from_env()?)
///     .with_event_sink(Arc::new(TracingEventSink))
///     .build()?;
/// let id = courier.lifecycle.create_delivery(request).await?;
/// ```
pub struct CourierBuilder {
    config: CourierConfig,
    clock: Option<Arc<dyn Clock>>,
    events: Option<Arc<dyn EventSink>>,
    store_latency: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("tx_max_attempts must be at least 1")]
    NoTransactionAttempts,
    #[error("operation timeout must be greater than zero")]
    ZeroOperationTimeout,
}

impl CourierBuilder {
    pub fn new(config: CourierConfig) -> Self {
        Self {
            config,
            clock: None,
            events: None,
            store_latency: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to `TracingEventSink`.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Simulated round trip inside store transactions.
    pub fn with_store_latency(mut self, latency: Duration) -> Self {
        self.store_latency = Some(latency);
        self
    }

    pub fn build(self) -> Result<Courier, BuildError> {
        if self.config.tx_max_attempts == 0 {
            return Err(BuildError::NoTransactionAttempts);
        }
        if self.config.operation_timeout_ms == 0 {
            return Err(BuildError::ZeroOperationTimeout);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let events = self.events.unwrap_or_else(|| Arc::new(TracingEventSink));
        let ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));

        let mut store = InMemoryDocumentStore::new(ids.clone(), self.config.tx_max_attempts);
        if let Some(latency) = self.store_latency {
            store = store.with_latency(latency);
        }
        let store = Arc::new(store);
        let directory = Arc::new(InMemoryUserDirectory::new(ids, Arc::clone(&clock)));
        let identity = Arc::new(StaticIdentityProvider::new());

        let repository = DeliveryRepository::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            self.config.operation_timeout(),
        );
        let lifecycle = DeliveryLifecycle::new(repository, directory.clone(), events, clock);
        let sessions = SessionResolver::new(identity.clone(), directory.clone());

        info!(
            tx_max_attempts = self.config.tx_max_attempts,
            operation_timeout_ms = self.config.operation_timeout_ms,
            "courier wired"
        );
        Ok(Courier {
            config: self.config,
            lifecycle,
            sessions,
            store,
            directory,
            identity,
        })
    }
}

/// A wired in-memory system. The concrete collaborators stay reachable for
/// registration and fault injection.
pub struct Courier {
    pub config: CourierConfig,
    pub lifecycle: DeliveryLifecycle<InMemoryDocumentStore>,
    pub sessions: SessionResolver,
    pub store: Arc<InMemoryDocumentStore>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub identity: Arc<StaticIdentityProvider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let courier = CourierBuilder::new(CourierConfig::default()).build();
        assert!(courier.is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = CourierConfig {
            tx_max_attempts: 0,
            ..CourierConfig::default()
        };
        assert!(matches!(
            CourierBuilder::new(config).build(),
            Err(BuildError::NoTransactionAttempts)
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = CourierConfig {
            operation_timeout_ms: 0,
            ..CourierConfig::default()
        };
        assert!(matches!(
            CourierBuilder::new(config).build(),
            Err(BuildError::ZeroOperationTimeout)
        ));
    }

    #[tokio::test]
    async fn wired_sessions_see_registered_users() {
        let courier = CourierBuilder::new(CourierConfig::default()).build().unwrap();
        let rider = courier
            .directory
            .register_rider(
                crate::impls::UserCore::new("Somchai", "0899999999"),
                crate::domain::Vehicle {
                    registration: "1AB 1234".to_string(),
                    image: None,
                },
            )
            .await
            .unwrap();
        courier.identity.issue("t", rider.clone());

        let actor = courier.sessions.resolve("t").await.unwrap();
        assert_eq!(actor.require_rider().unwrap(), &rider);
    }
}
