//! User profiles and roles.
//!
//! A user is either a customer (sends/receives deliveries, owns addresses) or a
//! rider (claims and carries deliveries). The role is a tagged variant carrying
//! the role-specific data, resolved once when a request enters the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::{Address, Coordinates};
use super::ids::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub registration: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Customer { addresses: Vec<Address> },
    Rider { vehicle: Vehicle },
}

impl Role {
    pub fn is_rider(&self) -> bool {
        matches!(self, Role::Rider { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Customer { .. } => "customer",
            Role::Rider { .. } => "rider",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub image_profile: Option<String>,
    #[serde(flatten)]
    pub role: Role,
}

impl UserProfile {
    pub fn addresses(&self) -> &[Address] {
        match &self.role {
            Role::Customer { addresses } => addresses,
            Role::Rider { .. } => &[],
        }
    }
}

/// Last position a rider reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiderLocation {
    pub coordinates: Coordinates,
    pub updated_at: DateTime<Utc>,
}
