//! Configuration handling for the Steampipe MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::access::AllowList;
use clap::{Parser, ValueEnum};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Connection pool settings handed to the pool adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOptions {
    /// Maximum connections in the pool.
    pub max_connections: u32,
    /// How long a tool call waits for a free connection.
    pub acquire_timeout_secs: u64,
    /// Idle connections are closed after this long.
    pub idle_timeout_secs: u64,
    /// Per-statement timeout.
    pub query_timeout_secs: u64,
}

impl PoolOptions {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Validate pool options.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }
        if self.acquire_timeout_secs == 0 {
            return Err("acquire_timeout must be greater than 0".to_string());
        }
        if self.query_timeout_secs == 0 {
            return Err("query_timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for remote clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the Steampipe MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "steampipe-mcp-server",
    about = "MCP server for querying Steampipe, gated by GitHub identity",
    version,
    author
)]
pub struct Config {
    /// PostgreSQL connection URL of the Steampipe service.
    /// Without it the database tools report that no pool is initialized.
    #[arg(long, value_name = "URL", env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Comma-separated GitHub logins allowed to use the tools.
    #[arg(long, default_value = "", env = "ALLOWED_USERNAMES")]
    pub allowed_usernames: String,

    /// GitHub access token identifying the caller (stdio transport).
    /// Over HTTP each caller sends their own token as a Bearer token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL.
    #[arg(long, default_value = DEFAULT_GITHUB_API_URL, env = "GITHUB_API_URL")]
    pub github_api_url: String,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Maximum pooled connections
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_CONNECTIONS,
        env = "MCP_MAX_CONNECTIONS"
    )]
    pub max_connections: u32,

    /// Seconds to wait for a free pooled connection
    #[arg(
        long,
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS,
        env = "MCP_ACQUIRE_TIMEOUT"
    )]
    pub acquire_timeout: u64,

    /// Seconds before an idle pooled connection is closed
    #[arg(
        long,
        default_value_t = DEFAULT_IDLE_TIMEOUT_SECS,
        env = "MCP_IDLE_TIMEOUT"
    )]
    pub idle_timeout: u64,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,

}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            database_url: None,
            allowed_usernames: String::new(),
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT_SECS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Pool settings collected from the individual flags.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            acquire_timeout_secs: self.acquire_timeout,
            idle_timeout_secs: self.idle_timeout,
            query_timeout_secs: self.query_timeout,
        }
    }

    /// The parsed username allow-list.
    pub fn allow_list(&self) -> AllowList {
        AllowList::parse(&self.allowed_usernames)
    }

    /// The database URL with its password removed, for logging.
    ///
    /// Returns `None` when no URL is configured. A URL that does not parse is
    /// replaced by a placeholder rather than echoed.
    pub fn redacted_database_url(&self) -> Option<String> {
        let raw = self.database_url.as_deref()?;
        match Url::parse(raw) {
            Ok(mut url) => {
                if url.password().is_some() {
                    // set_password only fails for cannot-be-a-base URLs, which have no password.
                    let _ = url.set_password(None);
                }
                Some(url.to_string())
            }
            Err(_) => Some("<invalid database url>".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
