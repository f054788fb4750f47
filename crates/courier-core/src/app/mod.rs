//! App - ports wired into the delivery service.
//!
//! - **DeliveryLifecycle**: the state machine (create, accept, pickup, deliver)
//! - **SessionResolver**: bearer token -> `Actor`
//! - **CourierBuilder**: config validation and in-memory wiring

pub mod builder;
pub mod lifecycle;
pub mod session;

pub use self::builder::{BuildError, Courier, CourierBuilder};
pub use self::lifecycle::{
    CreateDelivery, DeliveryLifecycle, DeliveryView, PartySummary, UserDeliveries,
};
pub use self::session::{Actor, SessionError, SessionResolver, bearer_token};
