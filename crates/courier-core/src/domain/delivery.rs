//! Delivery record and the stage changes that can be applied to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::errors::ConflictReason;
use super::ids::{DeliveryId, ImageRef, UserId};
use super::state::DeliveryStatus;

/// Everything the sender provides (after address ids have been resolved into
/// snapshots). Status and rider are never part of the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDelivery {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_address: Address,
    pub receiver_address: Address,
    pub item_description: String,
    pub item_image: ImageRef,
    pub rider_note_image: Option<ImageRef>,
}

/// A delivery.
///
/// Fields are private: status, rider and stage images only change through
/// [`Delivery::apply`], which enforces the lifecycle order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    id: DeliveryId,
    sender_id: UserId,
    receiver_id: UserId,
    sender_address: Address,
    receiver_address: Address,
    item_description: String,
    item_image: ImageRef,
    #[serde(default)]
    rider_note_image: Option<ImageRef>,
    status: DeliveryStatus,
    #[serde(default)]
    rider_id: Option<UserId>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    pickup_image: Option<ImageRef>,
    #[serde(default)]
    delivered_image: Option<ImageRef>,
}

/// One forward step of the lifecycle, with the data that step records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageChange {
    Accept { rider_id: UserId },
    ConfirmPickup { image: ImageRef },
    ConfirmDelivery { image: ImageRef },
}

impl StageChange {
    /// Status the delivery must be in for this change to apply.
    pub fn from_status(&self) -> DeliveryStatus {
        match self {
            StageChange::Accept { .. } => DeliveryStatus::Pending,
            StageChange::ConfirmPickup { .. } => DeliveryStatus::Accepted,
            StageChange::ConfirmDelivery { .. } => DeliveryStatus::PickedUp,
        }
    }

    /// Status the delivery ends up in.
    pub fn to_status(&self) -> DeliveryStatus {
        match self {
            StageChange::Accept { .. } => DeliveryStatus::Accepted,
            StageChange::ConfirmPickup { .. } => DeliveryStatus::PickedUp,
            StageChange::ConfirmDelivery { .. } => DeliveryStatus::Delivered,
        }
    }
}

impl Delivery {
    /// A freshly created delivery: pending, no rider, no stage images.
    pub fn pending(id: DeliveryId, new: NewDelivery, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            sender_address: new.sender_address,
            receiver_address: new.receiver_address,
            item_description: new.item_description,
            item_image: new.item_image,
            rider_note_image: new.rider_note_image,
            status: DeliveryStatus::Pending,
            rider_id: None,
            created_at,
            pickup_image: None,
            delivered_image: None,
        }
    }

    pub fn id(&self) -> DeliveryId {
        self.id
    }

    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    pub fn receiver_id(&self) -> &UserId {
        &self.receiver_id
    }

    pub fn sender_address(&self) -> &Address {
        &self.sender_address
    }

    pub fn receiver_address(&self) -> &Address {
        &self.receiver_address
    }

    pub fn item_description(&self) -> &str {
        &self.item_description
    }

    pub fn item_image(&self) -> &ImageRef {
        &self.item_image
    }

    pub fn rider_note_image(&self) -> Option<&ImageRef> {
        self.rider_note_image.as_ref()
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn rider_id(&self) -> Option<&UserId> {
        self.rider_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pickup_image(&self) -> Option<&ImageRef> {
        self.pickup_image.as_ref()
    }

    pub fn delivered_image(&self) -> Option<&ImageRef> {
        self.delivered_image.as_ref()
    }

    pub fn is_assigned_to(&self, rider_id: &UserId) -> bool {
        self.rider_id.as_ref() == Some(rider_id)
    }

    /// Apply one stage change in place.
    ///
    /// Fails without touching `self` if the delivery is not at the change's
    /// source status.
    pub fn apply(&mut self, change: StageChange) -> Result<(), ConflictReason> {
        let expected = change.from_status();
        if self.status != expected {
            return Err(match change {
                StageChange::Accept { .. } => ConflictReason::NotPending,
                _ => ConflictReason::WrongStage {
                    expected,
                    actual: self.status,
                },
            });
        }

        self.status = change.to_status();
        match change {
            StageChange::Accept { rider_id } => self.rider_id = Some(rider_id),
            StageChange::ConfirmPickup { image } => self.pickup_image = Some(image),
            StageChange::ConfirmDelivery { image } => self.delivered_image = Some(image),
        }
        Ok(())
    }

    /// Check the record-level invariants. Called at every write site.
    pub fn check_invariants(&self) -> Result<(), String> {
        let pending = self.status == DeliveryStatus::Pending;
        if pending == self.rider_id.is_some() {
            return Err(format!(
                "rider must be unset iff pending (status={}, rider={:?})",
                self.status, self.rider_id
            ));
        }
        let picked_up_or_later = self.status >= DeliveryStatus::PickedUp;
        if picked_up_or_later != self.pickup_image.is_some() {
            return Err(format!(
                "pickup image must be set iff picked up (status={})",
                self.status
            ));
        }
        let delivered = self.status == DeliveryStatus::Delivered;
        if delivered != self.delivered_image.is_some() {
            return Err(format!(
                "delivered image must be set iff delivered (status={})",
                self.status
            ));
        }
        Ok(())
    }

    /// Check that `next` may replace `self` in storage: same id and payload,
    /// status unchanged or one step forward, rider and stage images kept once
    /// set.
    pub fn check_successor(&self, next: &Delivery) -> Result<(), String> {
        if next.id != self.id {
            return Err(format!("delivery id changed from {} to {}", self.id, next.id));
        }
        let payload_kept = next.sender_id == self.sender_id
            && next.receiver_id == self.receiver_id
            && next.sender_address == self.sender_address
            && next.receiver_address == self.receiver_address
            && next.item_description == self.item_description
            && next.item_image == self.item_image
            && next.rider_note_image == self.rider_note_image
            && next.created_at == self.created_at;
        if !payload_kept {
            return Err(format!("delivery {} payload is immutable", self.id));
        }
        if next.status != self.status && Some(next.status) != self.status.next() {
            return Err(format!(
                "delivery {} cannot move from {} to {}",
                self.id, self.status, next.status
            ));
        }
        if self.rider_id.is_some() && next.rider_id != self.rider_id {
            return Err(format!(
                "delivery {} rider cannot change from {:?} to {:?}",
                self.id, self.rider_id, next.rider_id
            ));
        }
        if self.pickup_image.is_some() && next.pickup_image != self.pickup_image {
            return Err(format!("delivery {} pickup image is already recorded", self.id));
        }
        if self.delivered_image.is_some() && next.delivered_image != self.delivered_image {
            return Err(format!("delivery {} delivered image is already recorded", self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::address::Coordinates;
    use crate::domain::ids::AddressId;
    use ulid::Ulid;

    pub fn address(detail: &str) -> Address {
        Address {
            id: AddressId::from_ulid(Ulid::new()),
            detail: detail.to_string(),
            coordinates: Coordinates::new(13.75, 100.5),
        }
    }

    pub fn new_delivery() -> NewDelivery {
        NewDelivery {
            sender_id: UserId::new("0811111111"),
            receiver_id: UserId::new("0822222222"),
            sender_address: address("sender street"),
            receiver_address: address("receiver street"),
            item_description: "documents".to_string(),
            item_image: ImageRef::new("item.jpg"),
            rider_note_image: None,
        }
    }

    pub fn pending() -> Delivery {
        Delivery::pending(DeliveryId::from_ulid(Ulid::new()), new_delivery(), Utc::now())
    }
}
