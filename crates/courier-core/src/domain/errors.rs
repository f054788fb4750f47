//! Errors returned by the delivery core.
//!
//! Four kinds, each with a different caller contract:
//! - NotFound: the referenced delivery/address does not exist.
//! - Conflict: a status/identity precondition failed. Re-fetch and re-decide.
//! - Validation: malformed input, rejected before touching the store.
//! - RepositoryUnavailable: store/network failure. Safe to retry.

use thiserror::Error;

use super::ids::{AddressId, DeliveryId, UserId};
use super::state::DeliveryStatus;

/// Which precondition of a transition did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    /// Accept on a delivery that is no longer pending (someone else claimed it).
    #[error("delivery is not pending, it may have already been accepted")]
    NotPending,

    /// The delivery is not at the stage the operation requires.
    #[error("wrong stage: expected {expected}, found {actual}")]
    WrongStage {
        expected: DeliveryStatus,
        actual: DeliveryStatus,
    },

    /// The caller is not the rider assigned to this delivery.
    #[error("delivery is assigned to another rider")]
    WrongRider,
}

/// What could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("delivery {0}")]
    Delivery(DeliveryId),

    #[error("address {address_id} of user {user_id}")]
    Address {
        user_id: UserId,
        address_id: AddressId,
    },

    #[error("user {0}")]
    User(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("not found: {0}")]
    NotFound(Missing),

    #[error("cannot update {delivery_id}: {reason}")]
    Conflict {
        delivery_id: DeliveryId,
        reason: ConflictReason,
    },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),
}

impl DeliveryError {
    pub fn conflict(delivery_id: DeliveryId, reason: ConflictReason) -> Self {
        Self::Conflict {
            delivery_id,
            reason,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Only infrastructure failures are worth retrying as-is.
    /// A conflict must be resolved by re-reading state, not by replaying the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::RepositoryUnavailable(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DeliveryError::Conflict { .. })
    }

    pub fn conflict_reason(&self) -> Option<&ConflictReason> {
        match self {
            DeliveryError::Conflict { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
