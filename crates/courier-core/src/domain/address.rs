use serde::{Deserialize, Serialize};

use super::ids::AddressId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Address fields as sent by a client when creating or replacing an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPayload {
    pub detail: String,
    pub coordinates: Coordinates,
}

impl AddressPayload {
    pub fn new(detail: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            detail: detail.into(),
            coordinates,
        }
    }

    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.detail.trim().is_empty() {
            return Err("address detail must not be empty".to_string());
        }
        if !self.coordinates.is_valid() {
            return Err(format!(
                "coordinates out of range: ({}, {})",
                self.coordinates.latitude, self.coordinates.longitude
            ));
        }
        Ok(())
    }
}

/// A saved address.
///
/// Deliveries embed a copy of this value, so later edits in the directory do
/// not rewrite delivery history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub detail: String,
    pub coordinates: Coordinates,
}

impl Address {
    pub fn from_payload(id: AddressId, payload: AddressPayload) -> Self {
        Self {
            id,
            detail: payload.detail,
            coordinates: payload.coordinates,
        }
    }
}
