//! Per-session context.
//!
//! Over stdio there is one session, built from the configured token. Over HTTP
//! each MCP session is built from the Bearer token of the request that opened
//! it, via [`CallerResolver`].

use crate::access::{Access, AccessGate};
use crate::config::Config;
use crate::db::PgConnectionPool;
use crate::error::DbResult;
use crate::identity::GitHubClient;
use std::sync::Arc;
use tracing::info;

/// Everything a session's tools need, fixed when the session starts.
#[derive(Debug, Clone)]
pub struct SessionContext {
    identity: String,
    access_token: String,
    access: Access,
    pool: Option<PgConnectionPool>,
}

impl SessionContext {
    /// Build a context without a pool.
    pub fn new(identity: impl Into<String>, access_token: impl Into<String>, access: Access) -> Self {
        Self {
            identity: identity.into(),
            access_token: access_token.into(),
            access,
            pool: None,
        }
    }

    /// Attach `pool`, but only to an authorized session.
    pub fn with_pool(mut self, pool: Option<PgConnectionPool>) -> Self {
        if self.access.is_authorized() {
            self.pool = pool;
        }
        self
    }

    /// Build a context, creating a lazy pool only when the session is
    /// authorized and a database URL is configured.
    pub fn establish(
        config: &Config,
        identity: impl Into<String>,
        access_token: impl Into<String>,
        access: Access,
    ) -> DbResult<Self> {
        let session = Self::new(identity, access_token, access);
        if !access.is_authorized() {
            return Ok(session);
        }
        Ok(session.with_pool(connect_pool(config)?))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn pool(&self) -> Option<&PgConnectionPool> {
        self.pool.as_ref()
    }
}

/// The lazy pool for the configured database URL, if there is one.
pub fn connect_pool(config: &Config) -> DbResult<Option<PgConnectionPool>> {
    let Some(url) = config.database_url.as_deref() else {
        info!("No database URL configured; database tools will report not initialized");
        return Ok(None);
    };
    info!(
        database = config.redacted_database_url().as_deref().unwrap_or_default(),
        "Configuring database pool"
    );
    PgConnectionPool::connect_lazy(url, &config.pool_options()).map(Some)
}

/// Turns a caller's GitHub token into a session context.
///
/// The pool is shared by every authorized session.
#[derive(Debug, Clone)]
pub struct CallerResolver {
    github: Arc<GitHubClient>,
    gate: AccessGate,
    pool: Option<PgConnectionPool>,
}

impl CallerResolver {
    pub fn new(github: Arc<GitHubClient>, gate: AccessGate, pool: Option<PgConnectionPool>) -> Self {
        Self { github, gate, pool }
    }

    pub fn github(&self) -> &Arc<GitHubClient> {
        &self.github
    }

    pub fn pool(&self) -> Option<&PgConnectionPool> {
        self.pool.as_ref()
    }

    /// Verify `token` with GitHub and decide the caller's access.
    pub async fn resolve(&self, token: &str) -> DbResult<SessionContext> {
        let identity = self.github.authenticated_login(token).await?;
        let access = self.gate.decide(&identity);
        Ok(SessionContext::new(identity, token, access).with_pool(self.pool.clone()))
    }
}
