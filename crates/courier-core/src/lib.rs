//! courier-core
//!
//! Delivery coordination: customers create deliveries, riders race to claim
//! them, and the assigned rider drives each one through pickup and drop-off.
//!
//! # Modules
//! - **domain**: delivery record, status, stage changes, ids, profiles, errors, events
//! - **ports**: DocumentStore, IdentityProvider, UserDirectory, EventSink, Clock, IdGenerator
//! - **repository**: DeliveryRepository (guarded transitions over the document store)
//! - **app**: DeliveryLifecycle, SessionResolver, CourierBuilder
//! - **impls**: in-memory store, directory and identity provider
//! - **config**: `COURIER_*` environment configuration

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod repository;
