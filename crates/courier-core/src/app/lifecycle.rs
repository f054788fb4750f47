//! DeliveryLifecycle - the delivery state machine.
//!
//! Validates input and the caller's identity, then hands the write to the
//! repository as a single guarded transition:
//!
//! | operation          | expected status | rider check        | result      |
//! |--------------------|-----------------|--------------------|-------------|
//! | `accept_delivery`  | pending         | none (any rider)   | accepted    |
//! | `confirm_pickup`   | accepted        | must be assignee   | picked_up   |
//! | `confirm_delivery` | picked_up       | must be assignee   | delivered   |
//!
//! A `Conflict` goes straight back to the caller. The engine never retries;
//! whoever committed first owns the delivery.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{
    Address, AddressId, Delivery, DeliveryError, DeliveryEvent, DeliveryId, DeliveryStatus,
    ImageRef, Missing, NewDelivery, StageChange, UserId, UserProfile,
};
use crate::ports::{Clock, DirectoryError, DocumentStore, EventSink, UserDirectory};
use crate::repository::{DeliveryCounts, DeliveryRepository};

/// A sender's request to ship an item. Addresses are referenced by id and
/// copied into the delivery when it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDelivery {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_address_id: AddressId,
    pub receiver_address_id: AddressId,
    pub item_description: String,
    pub item_image: ImageRef,
    pub rider_note_image: Option<ImageRef>,
}

impl CreateDelivery {
    fn validate(&self) -> Result<(), DeliveryError> {
        if self.sender_id.is_blank() {
            return Err(DeliveryError::validation("sender id must not be empty"));
        }
        if self.receiver_id.is_blank() {
            return Err(DeliveryError::validation("receiver id must not be empty"));
        }
        if self.item_description.trim().is_empty() {
            return Err(DeliveryError::validation("item description must not be empty"));
        }
        if self.item_image.is_blank() {
            return Err(DeliveryError::validation("item image must not be empty"));
        }
        if self.rider_note_image.as_ref().is_some_and(ImageRef::is_blank) {
            return Err(DeliveryError::validation(
                "rider note image must be omitted or non-empty",
            ));
        }
        Ok(())
    }
}

/// Who is on one side of a delivery, as shown in listings.
///
/// `name` is empty and `image_profile` is `None` when the profile could not
/// be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySummary {
    pub user_id: UserId,
    pub name: String,
    pub image_profile: Option<String>,
}

impl PartySummary {
    fn unknown(user_id: UserId) -> Self {
        Self {
            user_id,
            name: String::new(),
            image_profile: None,
        }
    }
}

impl From<UserProfile> for PartySummary {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            name: profile.name,
            image_profile: profile.image_profile,
        }
    }
}

/// A listed delivery with its sender and receiver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryView {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub sender: PartySummary,
    pub receiver: PartySummary,
}

/// Deliveries a customer is part of, split by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserDeliveries {
    pub sent: Vec<DeliveryView>,
    pub received: Vec<DeliveryView>,
}

pub struct DeliveryLifecycle<S> {
    repository: DeliveryRepository<S>,
    directory: Arc<dyn UserDirectory>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for DeliveryLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            directory: Arc::clone(&self.directory),
            events: Arc::clone(&self.events),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: DocumentStore> DeliveryLifecycle<S> {
    pub fn new(
        repository: DeliveryRepository<S>,
        directory: Arc<dyn UserDirectory>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            directory,
            events,
            clock,
        }
    }

    pub fn repository(&self) -> &DeliveryRepository<S> {
        &self.repository
    }

    #[tracing::instrument(skip_all, fields(sender_id = %request.sender_id, receiver_id = %request.receiver_id))]
    pub async fn create_delivery(&self, request: CreateDelivery) -> Result<DeliveryId, DeliveryError> {
        request.validate()?;

        let sender_address = self
            .snapshot_address(&request.sender_id, request.sender_address_id)
            .await?;
        let receiver_address = self
            .snapshot_address(&request.receiver_id, request.receiver_address_id)
            .await?;

        let new = NewDelivery {
            sender_id: request.sender_id.clone(),
            receiver_id: request.receiver_id.clone(),
            sender_address,
            receiver_address,
            item_description: request.item_description,
            item_image: request.item_image,
            rider_note_image: request.rider_note_image,
        };
        let id = self.repository.create_pending(new).await?;

        self.events
            .emit(DeliveryEvent::Created {
                delivery_id: id,
                sender_id: request.sender_id,
                receiver_id: request.receiver_id,
                at: self.clock.now(),
            })
            .await;
        Ok(id)
    }

    /// Unclaimed deliveries with their parties, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<DeliveryView>, DeliveryError> {
        let pending = self.repository.list_by_status(DeliveryStatus::Pending).await?;
        Ok(self.with_parties(&mut HashMap::new(), pending).await)
    }

    /// Claim a pending delivery. Exactly one of several racing riders wins;
    /// the rest get `Conflict(NotPending)`.
    #[tracing::instrument(skip_all, fields(delivery_id = %id, rider_id = %rider_id))]
    pub async fn accept_delivery(&self, id: DeliveryId, rider_id: &UserId) -> Result<Delivery, DeliveryError> {
        if rider_id.is_blank() {
            return Err(DeliveryError::validation("rider id must not be empty"));
        }
        self.advance(
            id,
            None,
            StageChange::Accept {
                rider_id: rider_id.clone(),
            },
        )
        .await
    }

    #[tracing::instrument(skip_all, fields(delivery_id = %id, rider_id = %rider_id))]
    pub async fn confirm_pickup(
        &self,
        id: DeliveryId,
        rider_id: &UserId,
        image: ImageRef,
    ) -> Result<Delivery, DeliveryError> {
        if image.is_blank() {
            return Err(DeliveryError::validation("pickup image must not be empty"));
        }
        self.advance(id, Some(rider_id), StageChange::ConfirmPickup { image })
            .await
    }

    #[tracing::instrument(skip_all, fields(delivery_id = %id, rider_id = %rider_id))]
    pub async fn confirm_delivery(
        &self,
        id: DeliveryId,
        rider_id: &UserId,
        image: ImageRef,
    ) -> Result<Delivery, DeliveryError> {
        if image.is_blank() {
            return Err(DeliveryError::validation("delivered image must not be empty"));
        }
        self.advance(id, Some(rider_id), StageChange::ConfirmDelivery { image })
            .await
    }

    /// The delivery the rider is currently working on, if any.
    pub async fn active_delivery_for_rider(&self, rider_id: &UserId) -> Result<Option<Delivery>, DeliveryError> {
        let active = self.repository.list_active_for_rider(rider_id).await?;
        if active.len() > 1 {
            warn!(rider_id = %rider_id, count = active.len(), "rider holds more than one active delivery");
        }
        Ok(active.into_iter().next())
    }

    pub async fn deliveries_for_user(&self, user_id: &UserId) -> Result<UserDeliveries, DeliveryError> {
        let sent = self.repository.list_sent_by(user_id).await?;
        let received = self.repository.list_received_by(user_id).await?;

        let mut parties = HashMap::new();
        Ok(UserDeliveries {
            sent: self.with_parties(&mut parties, sent).await,
            received: self.with_parties(&mut parties, received).await,
        })
    }

    pub async fn get_delivery(&self, id: DeliveryId) -> Result<Delivery, DeliveryError> {
        self.repository.get(id).await
    }

    pub async fn status_counts(&self) -> Result<DeliveryCounts, DeliveryError> {
        self.repository.counts_by_status().await
    }

    async fn advance(
        &self,
        id: DeliveryId,
        required_rider: Option<&UserId>,
        change: StageChange,
    ) -> Result<Delivery, DeliveryError> {
        let expected = change.from_status();
        let delivery = match self
            .repository
            .transition(id, expected, required_rider, change)
            .await
        {
            Ok(delivery) => delivery,
            Err(err) => {
                debug!(error = %err, "transition rejected");
                return Err(err);
            }
        };

        info!(status = %delivery.status(), "delivery advanced");
        if let Some(event) = DeliveryEvent::for_status(&delivery, self.clock.now()) {
            self.events.emit(event).await;
        }
        Ok(delivery)
    }

    async fn with_parties(
        &self,
        parties: &mut HashMap<UserId, PartySummary>,
        deliveries: Vec<Delivery>,
    ) -> Vec<DeliveryView> {
        let mut views = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            let sender = self.party(parties, delivery.sender_id()).await;
            let receiver = self.party(parties, delivery.receiver_id()).await;
            views.push(DeliveryView {
                delivery,
                sender,
                receiver,
            });
        }
        views
    }

    async fn party(&self, parties: &mut HashMap<UserId, PartySummary>, user_id: &UserId) -> PartySummary {
        if let Some(known) = parties.get(user_id) {
            return known.clone();
        }
        let summary = match self.directory.profile(user_id).await {
            Ok(profile) => PartySummary::from(profile),
            Err(err) => {
                debug!(user_id = %user_id, error = %err, "party profile unavailable");
                PartySummary::unknown(user_id.clone())
            }
        };
        parties.insert(user_id.clone(), summary.clone());
        summary
    }

    async fn snapshot_address(&self, user_id: &UserId, address_id: AddressId) -> Result<Address, DeliveryError> {
        self.directory
            .address(user_id, address_id)
            .await
            .map_err(|err| match err {
                DirectoryError::AddressNotFound {
                    user_id,
                    address_id,
                } => DeliveryError::NotFound(Missing::Address {
                    user_id,
                    address_id,
                }),
                DirectoryError::UserNotFound(user_id) => DeliveryError::NotFound(Missing::User(user_id)),
                DirectoryError::Unavailable(message) => DeliveryError::RepositoryUnavailable(message),
                other => DeliveryError::Validation(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::app::builder::{Courier, CourierBuilder};
    use crate::config::CourierConfig;
    use crate::domain::delivery::fixtures::new_delivery;
    use crate::domain::{AddressPayload, ConflictReason, Coordinates, Vehicle};
    use crate::impls::{ProfileUpdate, UserCore};
    use crate::ports::{FixedClock, RecordingEventSink};
    use chrono::{TimeZone, Utc};

    struct Harness {
        courier: Courier,
        events: Arc<RecordingEventSink>,
        clock: Arc<FixedClock>,
        sender: UserId,
        receiver: UserId,
        request: CreateDelivery,
    }

    async fn harness_with(latency: Option<Duration>) -> Harness {
        let events = Arc::new(RecordingEventSink::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()));
        let mut builder = CourierBuilder::new(CourierConfig::default())
            .with_clock(clock.clone())
            .with_event_sink(events.clone());
        if let Some(latency) = latency {
            builder = builder.with_store_latency(latency);
        }
        let courier = builder.build().unwrap();

        let (sender, sender_address_id) = courier
            .directory
            .register_customer(
                UserCore::new("Malee", "0811111111"),
                AddressPayload::new("12 Silom Rd", Coordinates::new(13.72, 100.52)),
            )
            .await
            .unwrap();
        let (receiver, receiver_address_id) = courier
            .directory
            .register_customer(
                UserCore::new("Niran", "0822222222"),
                AddressPayload::new("7 Sukhumvit 11", Coordinates::new(13.74, 100.55)),
            )
            .await
            .unwrap();

        let request = CreateDelivery {
            sender_id: sender.clone(),
            receiver_id: receiver.clone(),
            sender_address_id,
            receiver_address_id,
            item_description: "contract documents".to_string(),
            item_image: ImageRef::new("item.jpg"),
            rider_note_image: None,
        };
        Harness {
            courier,
            events,
            clock,
            sender,
            receiver,
            request,
        }
    }

    async fn harness() -> Harness {
        harness_with(None).await
    }

    impl Harness {
        fn engine(&self) -> &DeliveryLifecycle<crate::impls::InMemoryDocumentStore> {
            &self.courier.lifecycle
        }

        async fn rider(&self, phone: &str) -> UserId {
            self.courier
                .directory
                .register_rider(
                    UserCore::new(format!("rider {phone}"), phone),
                    Vehicle {
                        registration: format!("REG {phone}"),
                        image: None,
                    },
                )
                .await
                .unwrap()
        }

        async fn create(&self) -> DeliveryId {
            self.engine().create_delivery(self.request.clone()).await.unwrap()
        }
    }

    fn img(name: &str) -> ImageRef {
        ImageRef::new(name)
    }

    #[tokio::test]
    async fn created_delivery_is_pending_and_listed() {
        let h = harness().await;
        let id = h.create().await;

        let delivery = h.engine().get_delivery(id).await.unwrap();
        assert_eq!(delivery.status(), DeliveryStatus::Pending);
        assert!(delivery.rider_id().is_none());
        assert_eq!(delivery.sender_id(), &h.sender);
        assert_eq!(delivery.receiver_address().detail, "7 Sukhumvit 11");

        let pending = h.engine().list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].delivery.id(), id);

        assert!(matches!(
            h.events.events().as_slice(),
            [DeliveryEvent::Created { delivery_id, .. }] if *delivery_id == id
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_riders_racing_one_wins() {
        let h = harness_with(Some(Duration::from_millis(5))).await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        let b = h.rider("0892222222").await;

        let (ra, rb) = tokio::join!(
            h.engine().accept_delivery(id, &a),
            h.engine().accept_delivery(id, &b)
        );

        let (winner, delivery, err) = match (ra, rb) {
            (Ok(delivery), Err(err)) => (a.clone(), delivery, err),
            (Err(err), Ok(delivery)) => (b.clone(), delivery, err),
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        assert!(delivery.is_assigned_to(&winner));
        assert_eq!(err.conflict_reason(), Some(&ConflictReason::NotPending));

        let stored = h.engine().get_delivery(id).await.unwrap();
        assert!(stored.is_assigned_to(&winner));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_riders_racing_exactly_one_claims() {
        let h = harness_with(Some(Duration::from_millis(2))).await;
        let id = h.create().await;

        let mut riders = Vec::new();
        for n in 0..16 {
            riders.push(h.rider(&format!("08930000{n:02}")).await);
        }

        let handles: Vec<_> = riders
            .iter()
            .cloned()
            .map(|rider| {
                let engine = h.engine().clone();
                tokio::spawn(async move { engine.accept_delivery(id, &rider).await })
            })
            .collect();

        let mut winners = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(delivery) => winners.push(delivery),
                Err(err) if err.is_conflict() => conflicts += 1,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts, riders.len() - 1);
        let accepted = h
            .events
            .events()
            .into_iter()
            .filter(|event| matches!(event, DeliveryEvent::Accepted { .. }))
            .count();
        assert_eq!(accepted, 1);
    }

    #[tokio::test]
    async fn other_rider_cannot_pick_up() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        let b = h.rider("0892222222").await;
        h.engine().accept_delivery(id, &a).await.unwrap();

        let err = h.engine().confirm_pickup(id, &b, img("b.jpg")).await.unwrap_err();

        assert_eq!(
            err,
            DeliveryError::conflict(id, ConflictReason::WrongRider)
        );
        let stored = h.engine().get_delivery(id).await.unwrap();
        assert_eq!(stored.status(), DeliveryStatus::Accepted);
        assert!(stored.is_assigned_to(&a));
    }

    #[tokio::test]
    async fn assigned_rider_completes_in_order() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;

        h.engine().accept_delivery(id, &a).await.unwrap();
        h.clock.advance(chrono::Duration::minutes(10));
        h.engine().confirm_pickup(id, &a, img("pickup.jpg")).await.unwrap();
        h.clock.advance(chrono::Duration::minutes(25));
        let done = h
            .engine()
            .confirm_delivery(id, &a, img("delivered.jpg"))
            .await
            .unwrap();

        assert_eq!(done.status(), DeliveryStatus::Delivered);
        assert_eq!(done.pickup_image(), Some(&img("pickup.jpg")));
        assert_eq!(done.delivered_image(), Some(&img("delivered.jpg")));
        assert!(done.is_assigned_to(&a));

        let names: Vec<_> = h.events.events().iter().map(DeliveryEvent::name).collect();
        assert_eq!(names, ["created", "accepted", "picked_up", "delivered"]);
        assert!(h.engine().active_delivery_for_rider(&a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delivery_before_pickup_is_wrong_stage() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        h.engine().accept_delivery(id, &a).await.unwrap();

        let err = h
            .engine()
            .confirm_delivery(id, &a, img("delivered.jpg"))
            .await
            .unwrap_err();

        assert_eq!(
            err.conflict_reason(),
            Some(&ConflictReason::WrongStage {
                expected: DeliveryStatus::PickedUp,
                actual: DeliveryStatus::Accepted,
            })
        );
        assert!(h.engine().get_delivery(id).await.unwrap().delivered_image().is_none());
    }

    #[tokio::test]
    async fn finished_delivery_rejects_every_further_step() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        let b = h.rider("0892222222").await;
        h.engine().accept_delivery(id, &a).await.unwrap();
        h.engine().confirm_pickup(id, &a, img("p.jpg")).await.unwrap();
        h.engine().confirm_delivery(id, &a, img("d.jpg")).await.unwrap();

        assert!(h.engine().accept_delivery(id, &b).await.unwrap_err().is_conflict());
        assert!(h.engine().confirm_pickup(id, &a, img("p2.jpg")).await.unwrap_err().is_conflict());
        assert!(h.engine().confirm_delivery(id, &a, img("d2.jpg")).await.unwrap_err().is_conflict());

        let stored = h.engine().get_delivery(id).await.unwrap();
        assert_eq!(stored.pickup_image(), Some(&img("p.jpg")));
        assert_eq!(stored.delivered_image(), Some(&img("d.jpg")));
    }

    #[tokio::test]
    async fn pickup_is_visible_as_active_delivery() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        assert!(h.engine().active_delivery_for_rider(&a).await.unwrap().is_none());

        h.engine().accept_delivery(id, &a).await.unwrap();
        h.engine().confirm_pickup(id, &a, img("pickup.jpg")).await.unwrap();

        let active = h.engine().active_delivery_for_rider(&a).await.unwrap().unwrap();
        assert_eq!(active.id(), id);
        assert_eq!(active.status(), DeliveryStatus::PickedUp);
        assert_eq!(active.pickup_image(), Some(&img("pickup.jpg")));
    }

    #[tokio::test]
    async fn addresses_are_snapshotted_at_creation() {
        let h = harness().await;
        let id = h.create().await;

        h.courier
            .directory
            .update_address(
                &h.sender,
                h.request.sender_address_id,
                AddressPayload::new("moved away", Coordinates::new(18.79, 98.98)),
            )
            .await
            .unwrap();

        let delivery = h.engine().get_delivery(id).await.unwrap();
        assert_eq!(delivery.sender_address().detail, "12 Silom Rd");
    }

    #[tokio::test]
    async fn unknown_address_is_not_found_and_nothing_is_written() {
        let h = harness().await;
        let mut request = h.request.clone();
        request.receiver_address_id = request.sender_address_id;

        let err = h.engine().create_delivery(request).await.unwrap_err();

        assert!(matches!(err, DeliveryError::NotFound(Missing::Address { .. })));
        assert_eq!(h.engine().status_counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_the_store() {
        let h = harness().await;
        h.courier.store.set_available(false);

        let mut request = h.request.clone();
        request.item_description = "   ".to_string();
        assert!(matches!(
            h.engine().create_delivery(request).await,
            Err(DeliveryError::Validation(_))
        ));

        let id = DeliveryId::from_ulid(ulid::Ulid::new());
        let rider = UserId::new("0891111111");
        assert!(matches!(
            h.engine().confirm_pickup(id, &rider, img(" ")).await,
            Err(DeliveryError::Validation(_))
        ));
        assert!(matches!(
            h.engine().accept_delivery(id, &UserId::new("")).await,
            Err(DeliveryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn store_outage_is_retryable_not_conflict() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        h.courier.store.set_available(false);

        let err = h.engine().accept_delivery(id, &a).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.is_conflict());

        h.courier.store.set_available(true);
        let delivery = h.engine().accept_delivery(id, &a).await.unwrap();
        assert!(delivery.is_assigned_to(&a));
    }

    #[tokio::test]
    async fn user_deliveries_are_split_by_side() {
        let h = harness().await;
        h.create().await;
        h.create().await;

        let sender_view = h.engine().deliveries_for_user(&h.sender).await.unwrap();
        assert_eq!(sender_view.sent.len(), 2);
        assert!(sender_view.received.is_empty());

        let receiver_view = h.engine().deliveries_for_user(&h.receiver).await.unwrap();
        assert!(receiver_view.sent.is_empty());
        assert_eq!(receiver_view.received.len(), 2);
    }

    #[tokio::test]
    async fn listings_name_both_parties() {
        let h = harness().await;
        let id = h.create().await;
        h.courier
            .directory
            .update_profile(
                &h.sender,
                ProfileUpdate {
                    image_profile: Some("malee.jpg".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        let pending = h.engine().list_pending().await.unwrap();
        assert_eq!(pending[0].delivery.id(), id);
        assert_eq!(pending[0].sender.name, "Malee");
        assert_eq!(pending[0].sender.image_profile.as_deref(), Some("malee.jpg"));
        assert_eq!(pending[0].receiver.name, "Niran");
        assert_eq!(pending[0].receiver.user_id, h.receiver);

        let received = h.engine().deliveries_for_user(&h.receiver).await.unwrap().received;
        assert_eq!(received[0].sender.name, "Malee");
        assert_eq!(received[0].receiver.name, "Niran");

        let json = serde_json::to_value(&pending[0]).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["sender"]["name"], "Malee");
    }

    #[tokio::test]
    async fn unknown_party_leaves_summary_empty() {
        let h = harness().await;
        let mut new = new_delivery();
        new.receiver_id = UserId::new("0877777777");
        let id = h.engine().repository().create_pending(new).await.unwrap();

        let pending = h.engine().list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].delivery.id(), id);
        assert_eq!(pending[0].sender.name, "Malee");
        assert_eq!(
            pending[0].receiver,
            PartySummary {
                user_id: UserId::new("0877777777"),
                name: String::new(),
                image_profile: None,
            }
        );
    }

    #[tokio::test]
    async fn other_rider_cannot_confirm_delivery() {
        let h = harness().await;
        let id = h.create().await;
        let a = h.rider("0891111111").await;
        let b = h.rider("0892222222").await;
        h.engine().accept_delivery(id, &a).await.unwrap();
        h.engine().confirm_pickup(id, &a, img("pickup.jpg")).await.unwrap();

        let err = h
            .engine()
            .confirm_delivery(id, &b, img("b.jpg"))
            .await
            .unwrap_err();

        assert_eq!(err, DeliveryError::conflict(id, ConflictReason::WrongRider));
        let stored = h.engine().get_delivery(id).await.unwrap();
        assert_eq!(stored.status(), DeliveryStatus::PickedUp);
        assert!(stored.delivered_image().is_none());
        assert!(stored.is_assigned_to(&a));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn only_the_assignee_advances_when_riders_race() {
        let h = harness_with(Some(Duration::from_millis(2))).await;
        let id = h.create().await;
        let mut riders = Vec::new();
        for n in 0..8 {
            riders.push(h.rider(&format!("08940000{n:02}")).await);
        }
        let assignee = riders[3].clone();
        h.engine().accept_delivery(id, &assignee).await.unwrap();

        for stage in [DeliveryStatus::PickedUp, DeliveryStatus::Delivered] {
            let handles: Vec<_> = riders
                .iter()
                .cloned()
                .map(|rider| {
                    let engine = h.engine().clone();
                    tokio::spawn(async move {
                        let image = img(&format!("{stage}-{rider}.jpg"));
                        let result = match stage {
                            DeliveryStatus::PickedUp => engine.confirm_pickup(id, &rider, image).await,
                            _ => engine.confirm_delivery(id, &rider, image).await,
                        };
                        (rider, result)
                    })
                })
                .collect();

            let mut winners = Vec::new();
            for handle in handles {
                match handle.await.unwrap() {
                    (rider, Ok(_)) => winners.push(rider),
                    (_, Err(err)) => {
                        assert_eq!(err.conflict_reason(), Some(&ConflictReason::WrongRider))
                    }
                }
            }
            assert_eq!(winners, vec![assignee.clone()]);

            let stored = h.engine().get_delivery(id).await.unwrap();
            assert_eq!(stored.status(), stage);
            assert!(stored.is_assigned_to(&assignee));
        }

        let stored = h.engine().get_delivery(id).await.unwrap();
        assert_eq!(
            stored.pickup_image(),
            Some(&img(&format!("picked_up-{assignee}.jpg")))
        );
        let names: Vec<_> = h.events.events().iter().map(DeliveryEvent::name).collect();
        assert_eq!(names, ["created", "accepted", "picked_up", "delivered"]);
    }

    #[tokio::test]
    async fn missing_delivery_is_not_found() {
        let h = harness().await;
        let a = h.rider("0891111111").await;
        let id = DeliveryId::from_ulid(ulid::Ulid::new());

        assert_eq!(
            h.engine().accept_delivery(id, &a).await.unwrap_err(),
            DeliveryError::NotFound(Missing::Delivery(id))
        );
    }
}
