use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::UserId;
use crate::ports::{IdentityError, IdentityProvider};

#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as belonging to `user_id`.
    pub fn issue(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(token.into(), user_id);
    }

    pub fn revoke(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(token);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<UserId, IdentityError> {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(token)
            .cloned()
            .ok_or(IdentityError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_tokens_verify_until_revoked() {
        let idp = StaticIdentityProvider::new();
        idp.issue("tok-1", UserId::new("0811111111"));

        assert_eq!(idp.verify_token("tok-1").await.unwrap(), UserId::new("0811111111"));
        assert_eq!(idp.verify_token("nope").await, Err(IdentityError::InvalidToken));

        idp.revoke("tok-1");
        assert_eq!(idp.verify_token("tok-1").await, Err(IdentityError::InvalidToken));
    }
}
