//! EventSink port - where committed delivery events go.
//!
//! Emission happens after the store commit and is best effort: a failing sink
//! never turns a committed transition into an error for the caller.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::DeliveryEvent;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: DeliveryEvent);
}

/// Writes each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: DeliveryEvent) {
        info!(
            event = event.name(),
            delivery_id = %event.delivery_id(),
            "delivery event"
        );
    }
}

/// Keeps events in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DeliveryEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DeliveryEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: DeliveryEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
