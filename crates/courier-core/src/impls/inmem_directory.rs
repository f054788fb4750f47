//! Users keyed by phone number (the identity provider's uid).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::{
    Address, AddressId, AddressPayload, Coordinates, RiderLocation, Role, UserId, UserProfile,
    Vehicle,
};
use crate::ports::{Clock, DirectoryError, IdGenerator, UserDirectory};

/// Fields every user provides at sign-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    pub phone: String,
    pub image_profile: Option<String>,
}

impl UserCore {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            image_profile: None,
        }
    }

    fn validate(&self) -> Result<(), DirectoryError> {
        if self.name.trim().is_empty() {
            return Err(DirectoryError::Invalid("name must not be empty".to_string()));
        }
        if self.phone.len() < 9 || !self.phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(DirectoryError::Invalid(format!(
                "phone '{}' must be at least 9 digits",
                self.phone
            )));
        }
        Ok(())
    }
}

/// Partial profile update; `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub image_profile: Option<String>,
    pub vehicle_registration: Option<String>,
    pub vehicle_image: Option<String>,
}

pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
    locations: RwLock<HashMap<UserId, RiderLocation>>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl InMemoryUserDirectory {
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
            ids,
            clock,
        }
    }

    /// Register a customer with their first address.
    pub async fn register_customer(
        &self,
        core: UserCore,
        address: AddressPayload,
    ) -> Result<(UserId, AddressId), DirectoryError> {
        core.validate()?;
        address.validate().map_err(DirectoryError::Invalid)?;

        let address_id = self.ids.generate_address_id();
        let role = Role::Customer {
            addresses: vec![Address::from_payload(address_id, address)],
        };
        let user_id = self.insert(core, role).await?;
        Ok((user_id, address_id))
    }

    pub async fn register_rider(
        &self,
        core: UserCore,
        vehicle: Vehicle,
    ) -> Result<UserId, DirectoryError> {
        core.validate()?;
        if vehicle.registration.trim().is_empty() {
            return Err(DirectoryError::Invalid(
                "vehicle registration must not be empty".to_string(),
            ));
        }
        self.insert(core, Role::Rider { vehicle }).await
    }

    async fn insert(&self, core: UserCore, role: Role) -> Result<UserId, DirectoryError> {
        let user_id = UserId::new(core.phone.clone());
        let mut users = self.users.write().await;
        if users.contains_key(&user_id) {
            return Err(DirectoryError::AlreadyRegistered(user_id));
        }
        info!(user_id = %user_id, role = role.name(), "user registered");
        users.insert(
            user_id.clone(),
            UserProfile {
                user_id: user_id.clone(),
                name: core.name,
                phone: core.phone,
                image_profile: core.image_profile,
                role,
            },
        );
        Ok(user_id)
    }

    /// Add an address; returns the customer's full address list.
    pub async fn add_address(
        &self,
        user_id: &UserId,
        payload: AddressPayload,
    ) -> Result<Vec<Address>, DirectoryError> {
        payload.validate().map_err(DirectoryError::Invalid)?;
        let address_id = self.ids.generate_address_id();

        let mut users = self.users.write().await;
        let addresses = customer_addresses_mut(&mut users, user_id)?;
        addresses.push(Address::from_payload(address_id, payload));
        Ok(addresses.clone())
    }

    /// Replace an existing address; returns the customer's full address list.
    pub async fn update_address(
        &self,
        user_id: &UserId,
        address_id: AddressId,
        payload: AddressPayload,
    ) -> Result<Vec<Address>, DirectoryError> {
        payload.validate().map_err(DirectoryError::Invalid)?;

        let mut users = self.users.write().await;
        let addresses = customer_addresses_mut(&mut users, user_id)?;
        let slot = addresses
            .iter_mut()
            .find(|address| address.id == address_id)
            .ok_or_else(|| DirectoryError::AddressNotFound {
                user_id: user_id.clone(),
                address_id,
            })?;
        *slot = Address::from_payload(address_id, payload);
        Ok(addresses.clone())
    }

    pub async fn update_profile(
        &self,
        user_id: &UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DirectoryError> {
        let mut users = self.users.write().await;
        let profile = users
            .get_mut(user_id)
            .ok_or_else(|| DirectoryError::UserNotFound(user_id.clone()))?;

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(DirectoryError::Invalid("name must not be empty".to_string()));
            }
            profile.name = name;
        }
        if let Some(image) = update.image_profile {
            profile.image_profile = Some(image);
        }
        if let Role::Rider { vehicle } = &mut profile.role {
            if let Some(registration) = update.vehicle_registration {
                vehicle.registration = registration;
            }
            if let Some(image) = update.vehicle_image {
                vehicle.image = Some(image);
            }
        }
        Ok(profile.clone())
    }

    /// Record a rider's current position, replacing the previous one.
    pub async fn update_rider_location(
        &self,
        rider_id: &UserId,
        coordinates: Coordinates,
    ) -> Result<RiderLocation, DirectoryError> {
        if !coordinates.is_valid() {
            return Err(DirectoryError::Invalid(format!(
                "coordinates out of range: ({}, {})",
                coordinates.latitude, coordinates.longitude
            )));
        }
        if !self.profile(rider_id).await?.role.is_rider() {
            return Err(DirectoryError::Invalid(format!("user {rider_id} is not a rider")));
        }

        let location = RiderLocation {
            coordinates,
            updated_at: self.clock.now(),
        };
        self.locations
            .write()
            .await
            .insert(rider_id.clone(), location);
        Ok(location)
    }

    pub async fn rider_location(&self, rider_id: &UserId) -> Option<RiderLocation> {
        self.locations.read().await.get(rider_id).copied()
    }

    /// Look a user up by phone number (used by senders to pick a receiver).
    pub async fn find_by_phone(&self, phone: &str) -> Result<UserProfile, DirectoryError> {
        self.profile(&UserId::new(phone)).await
    }
}

fn customer_addresses_mut<'a>(
    users: &'a mut HashMap<UserId, UserProfile>,
    user_id: &UserId,
) -> Result<&'a mut Vec<Address>, DirectoryError> {
    let profile = users
        .get_mut(user_id)
        .ok_or_else(|| DirectoryError::UserNotFound(user_id.clone()))?;
    match &mut profile.role {
        Role::Customer { addresses } => Ok(addresses),
        Role::Rider { .. } => Err(DirectoryError::Invalid(format!(
            "user {user_id} is a rider and has no address book"
        ))),
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn profile(&self, user_id: &UserId) -> Result<UserProfile, DirectoryError> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UserNotFound(user_id.clone()))
    }

    async fn address(
        &self,
        user_id: &UserId,
        address_id: AddressId,
    ) -> Result<Address, DirectoryError> {
        let profile = self.profile(user_id).await?;
        profile
            .addresses()
            .iter()
            .find(|address| address.id == address_id)
            .cloned()
            .ok_or_else(|| DirectoryError::AddressNotFound {
                user_id: user_id.clone(),
                address_id,
            })
    }

    async fn addresses(&self, user_id: &UserId) -> Result<Vec<Address>, DirectoryError> {
        Ok(self.profile(user_id).await?.addresses().to_vec())
    }
}
