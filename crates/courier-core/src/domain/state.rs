//! Delivery status: the lifecycle state machine's states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery status.
///
/// State transitions (one step at a time, never backwards):
/// - Pending -> Accepted   (a rider claims it)
/// - Accepted -> PickedUp  (assigned rider confirms pickup)
/// - PickedUp -> Delivered (assigned rider confirms drop-off)
///
/// The derived `Ord` follows declaration order, which is the lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Waiting for a rider. No rider assigned.
    Pending,

    /// Claimed by exactly one rider.
    Accepted,

    /// The assigned rider has the item.
    PickedUp,

    /// Handed over to the receiver.
    Delivered,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 4] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Accepted,
        DeliveryStatus::PickedUp,
        DeliveryStatus::Delivered,
    ];

    /// The only status this one may advance to.
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Pending => Some(DeliveryStatus::Accepted),
            DeliveryStatus::Accepted => Some(DeliveryStatus::PickedUp),
            DeliveryStatus::PickedUp => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered)
    }

    /// A rider is on the job (counts toward "active delivery").
    pub fn is_active(self) -> bool {
        matches!(self, DeliveryStatus::Accepted | DeliveryStatus::PickedUp)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Accepted => "accepted",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
