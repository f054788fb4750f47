//! In-memory implementations of the ports.

pub mod inmem_directory;
pub mod inmem_store;
pub mod static_identity;

pub use self::inmem_directory::{InMemoryUserDirectory, ProfileUpdate, UserCore};
pub use self::inmem_store::InMemoryDocumentStore;
pub use self::static_identity::StaticIdentityProvider;
