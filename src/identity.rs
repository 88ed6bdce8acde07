//! GitHub identity lookup.
//!
//! The caller's identity is the `login` of the GitHub user that owns the
//! configured access token.

use crate::error::{DbError, DbResult};
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Resolves an access token to the user record it belongs to.
pub trait IdentityProvider: Send + Sync {
    /// Fetch the authenticated user's record.
    fn authenticated_user(&self, token: &str)
    -> impl Future<Output = DbResult<JsonValue>> + Send;
}

/// Client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>) -> DbResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("steampipe-mcp-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DbError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a token to its GitHub login.
    pub async fn authenticated_login(&self, token: &str) -> DbResult<String> {
        let user = self.authenticated_user(token).await?;
        user.get("login")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| DbError::identity("GitHub user record has no login"))
    }
}

impl IdentityProvider for GitHubClient {
    async fn authenticated_user(&self, token: &str) -> DbResult<JsonValue> {
        let url = format!("{}/user", self.api_url);
        debug!(url = %url, "Fetching authenticated GitHub user");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<JsonValue>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(JsonValue::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(DbError::identity(format!("GitHub returned {}: {}", status, message)));
        }

        Ok(response.json::<JsonValue>().await?)
    }
}
