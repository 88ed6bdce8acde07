//! Steampipe MCP Server - Main entry point.
//!
//! Over stdio the configured GitHub token identifies the single caller. Over
//! HTTP every session is identified by the Bearer token that opened it.

use std::sync::Arc;
use steampipe_mcp_server::access::AccessGate;
use steampipe_mcp_server::config::{Config, TransportMode};
use steampipe_mcp_server::identity::GitHubClient;
use steampipe_mcp_server::error::DbError;
use steampipe_mcp_server::session::{CallerResolver, SessionContext, connect_pool};
use steampipe_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting Steampipe MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    config.pool_options().validate()?;

    let github = Arc::new(GitHubClient::new(&config.github_api_url)?);
    let gate = AccessGate::new(config.allow_list());

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let token = config.github_token.clone().ok_or_else(|| {
                DbError::identity("GITHUB_TOKEN is required for the stdio transport")
            })?;
            let identity = github.authenticated_login(&token).await?;
            info!(identity = %identity, "Verified GitHub identity");

            let access = gate.decide(&identity);
            let session = Arc::new(SessionContext::establish(&config, identity, token, access)?);
            StdioTransport::new(session, github).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let resolver = Arc::new(CallerResolver::new(github, gate, connect_pool(&config)?));
            HttpTransport::new(
                resolver,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
