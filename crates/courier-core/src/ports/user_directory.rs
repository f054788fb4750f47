//! UserDirectory port - user profiles and saved addresses.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Address, AddressId, UserId, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("address {address_id} not found for user {user_id}")]
    AddressNotFound {
        user_id: UserId,
        address_id: AddressId,
    },

    #[error("user {0} is already registered")]
    AlreadyRegistered(UserId),

    #[error("invalid profile data: {0}")]
    Invalid(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn profile(&self, user_id: &UserId) -> Result<UserProfile, DirectoryError>;

    async fn address(
        &self,
        user_id: &UserId,
        address_id: AddressId,
    ) -> Result<Address, DirectoryError>;

    async fn addresses(&self, user_id: &UserId) -> Result<Vec<Address>, DirectoryError>;
}
