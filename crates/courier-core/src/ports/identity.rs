//! IdentityProvider port - bearer token verification.
//!
//! Token issuance and signature checking belong to the external provider. The
//! core only needs "which user does this token belong to".

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<UserId, IdentityError>;
}
