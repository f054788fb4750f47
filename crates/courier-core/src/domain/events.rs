//! Domain events emitted after a delivery change has been committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::delivery::Delivery;
use super::ids::{DeliveryId, UserId};
use super::state::DeliveryStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryEvent {
    Created {
        delivery_id: DeliveryId,
        sender_id: UserId,
        receiver_id: UserId,
        at: DateTime<Utc>,
    },
    Accepted {
        delivery_id: DeliveryId,
        rider_id: UserId,
        at: DateTime<Utc>,
    },
    PickedUp {
        delivery_id: DeliveryId,
        rider_id: UserId,
        at: DateTime<Utc>,
    },
    Delivered {
        delivery_id: DeliveryId,
        rider_id: UserId,
        at: DateTime<Utc>,
    },
}

impl DeliveryEvent {
    /// Event describing the status `delivery` has just entered.
    ///
    /// Returns `None` for a non-pending delivery without a rider, which a
    /// committed delivery never is.
    pub fn for_status(delivery: &Delivery, at: DateTime<Utc>) -> Option<Self> {
        let delivery_id = delivery.id();
        let event = match delivery.status() {
            DeliveryStatus::Pending => DeliveryEvent::Created {
                delivery_id,
                sender_id: delivery.sender_id().clone(),
                receiver_id: delivery.receiver_id().clone(),
                at,
            },
            DeliveryStatus::Accepted => DeliveryEvent::Accepted {
                delivery_id,
                rider_id: delivery.rider_id()?.clone(),
                at,
            },
            DeliveryStatus::PickedUp => DeliveryEvent::PickedUp {
                delivery_id,
                rider_id: delivery.rider_id()?.clone(),
                at,
            },
            DeliveryStatus::Delivered => DeliveryEvent::Delivered {
                delivery_id,
                rider_id: delivery.rider_id()?.clone(),
                at,
            },
        };
        Some(event)
    }

    pub fn delivery_id(&self) -> DeliveryId {
        match self {
            DeliveryEvent::Created { delivery_id, .. }
            | DeliveryEvent::Accepted { delivery_id, .. }
            | DeliveryEvent::PickedUp { delivery_id, .. }
            | DeliveryEvent::Delivered { delivery_id, .. } => *delivery_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeliveryEvent::Created { .. } => "created",
            DeliveryEvent::Accepted { .. } => "accepted",
            DeliveryEvent::PickedUp { .. } => "picked_up",
            DeliveryEvent::Delivered { .. } => "delivered",
        }
    }
}
