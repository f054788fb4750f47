//! SessionResolver - turns a bearer token into an explicit `Actor`.
//!
//! Resolution happens once per request at the boundary; everything past it
//! receives the caller's identity and role as plain parameters.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{Role, UserId};
use crate::ports::{DirectoryError, IdentityError, IdentityProvider, UserDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("authorization header is required")]
    MissingToken,
    #[error("invalid authorization token")]
    InvalidToken,
    #[error("user {0} has no profile")]
    UnknownUser(UserId),
    #[error("user {0} is not a rider")]
    NotARider(UserId),
    #[error("user {0} is not a customer")]
    NotACustomer(UserId),
    #[error("session lookup unavailable: {0}")]
    Unavailable(String),
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// The caller's id, if they are a rider.
    pub fn require_rider(&self) -> Result<&UserId, SessionError> {
        match self.role {
            Role::Rider { .. } => Ok(&self.user_id),
            Role::Customer { .. } => Err(SessionError::NotARider(self.user_id.clone())),
        }
    }

    pub fn require_customer(&self) -> Result<&UserId, SessionError> {
        match self.role {
            Role::Customer { .. } => Ok(&self.user_id),
            Role::Rider { .. } => Err(SessionError::NotACustomer(self.user_id.clone())),
        }
    }
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then_some(token)
}

#[derive(Clone)]
pub struct SessionResolver {
    identity: Arc<dyn IdentityProvider>,
    directory: Arc<dyn UserDirectory>,
}

impl SessionResolver {
    pub fn new(identity: Arc<dyn IdentityProvider>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            identity,
            directory,
        }
    }

    /// Resolve a raw `Authorization` header value.
    pub async fn resolve_header(&self, header: Option<&str>) -> Result<Actor, SessionError> {
        let token = header
            .and_then(bearer_token)
            .ok_or(SessionError::MissingToken)?;
        self.resolve(token).await
    }

    pub async fn resolve(&self, token: &str) -> Result<Actor, SessionError> {
        let user_id = self.identity.verify_token(token).await.map_err(|err| match err {
            IdentityError::InvalidToken => SessionError::InvalidToken,
            IdentityError::Unavailable(message) => SessionError::Unavailable(message),
        })?;

        let profile = self.directory.profile(&user_id).await.map_err(|err| match err {
            DirectoryError::UserNotFound(user_id) => SessionError::UnknownUser(user_id),
            other => SessionError::Unavailable(other.to_string()),
        })?;

        debug!(user_id = %user_id, role = profile.role.name(), "session resolved");
        Ok(Actor {
            user_id,
            role: profile.role,
        })
    }
}
