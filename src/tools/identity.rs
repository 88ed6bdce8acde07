//! GitHub identity tool.

use crate::error::DbResult;
use crate::identity::IdentityProvider;
use crate::tools::envelope::Envelope;
use std::sync::Arc;

pub const USER_INFO_FAILED: &str = "Failed to get user info";

/// Handler for the identity tool. Holds the session's access token.
#[derive(Debug)]
pub struct IdentityToolHandler<I> {
    provider: Arc<I>,
    access_token: String,
}

impl<I> Clone for IdentityToolHandler<I> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            access_token: self.access_token.clone(),
        }
    }
}

impl<I: IdentityProvider> IdentityToolHandler<I> {
    pub fn new(provider: Arc<I>, access_token: impl Into<String>) -> Self {
        Self {
            provider,
            access_token: access_token.into(),
        }
    }

    /// Return the authenticated user's record verbatim.
    pub async fn user_info(&self) -> DbResult<Envelope> {
        let user = self
            .provider
            .authenticated_user(&self.access_token)
            .await
            .map_err(|e| e.within(USER_INFO_FAILED))?;
        Ok(Envelope::json(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use serde_json::{Value as JsonValue, json};

    struct FixedIdentity(Option<JsonValue>);

    impl IdentityProvider for FixedIdentity {
        async fn authenticated_user(&self, token: &str) -> DbResult<JsonValue> {
            assert_eq!(token, "ghp_test");
            self.0
                .clone()
                .ok_or_else(|| DbError::identity("GitHub returned 401 Unauthorized: Bad credentials"))
        }
    }

    #[tokio::test]
    async fn test_user_info_returns_record_verbatim() {
        let record = json!({ "login": "alice", "id": 1, "site_admin": false });
        let handler = IdentityToolHandler::new(Arc::new(FixedIdentity(Some(record.clone()))), "ghp_test");
        let envelope = handler.user_info().await.unwrap();
        assert_eq!(envelope.as_json(), Some(&record));
    }

    #[tokio::test]
    async fn test_user_info_failure_is_prefixed() {
        let handler = IdentityToolHandler::new(Arc::new(FixedIdentity(None)), "ghp_test");
        let err = handler.user_info().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get user info: GitHub returned 401 Unauthorized: Bad credentials"
        );
    }
}
