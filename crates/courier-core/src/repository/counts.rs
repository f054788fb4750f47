use serde::{Deserialize, Serialize};

use crate::domain::DeliveryStatus;

/// Number of deliveries in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounts {
    pub pending: usize,
    pub accepted: usize,
    pub picked_up: usize,
    pub delivered: usize,
}

impl DeliveryCounts {
    pub fn record(&mut self, status: DeliveryStatus) {
        match status {
            DeliveryStatus::Pending => self.pending += 1,
            DeliveryStatus::Accepted => self.accepted += 1,
            DeliveryStatus::PickedUp => self.picked_up += 1,
            DeliveryStatus::Delivered => self.delivered += 1,
        }
    }

    pub fn get(&self, status: DeliveryStatus) -> usize {
        match status {
            DeliveryStatus::Pending => self.pending,
            DeliveryStatus::Accepted => self.accepted,
            DeliveryStatus::PickedUp => self.picked_up,
            DeliveryStatus::Delivered => self.delivered,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.picked_up + self.delivered
    }
}
