//! Domain model (ids, status, delivery record, addresses, profiles, errors, events).

pub mod address;
pub mod delivery;
pub mod errors;
pub mod events;
pub mod ids;
pub mod profile;
pub mod state;

pub use address::{Address, AddressPayload, Coordinates};
pub use delivery::{Delivery, NewDelivery, StageChange};
pub use errors::{ConflictReason, DeliveryError, Missing};
pub use events::DeliveryEvent;
pub use ids::{AddressId, DeliveryId, Id, IdMarker, ImageRef, ParseIdError, UserId};
pub use profile::{RiderLocation, Role, UserProfile, Vehicle};
pub use state::DeliveryStatus;
