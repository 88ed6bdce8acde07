//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.

use crate::error::{DbError, DbResult};
use crate::identity::GitHubClient;
use crate::mcp::SteampipeService;
use crate::session::SessionContext;
use crate::transport::{Transport, close_pool, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// Reads JSON-RPC messages from stdin and writes responses to stdout. Logs go
/// to stderr.
pub struct StdioTransport {
    session: Arc<SessionContext>,
    github: Arc<GitHubClient>,
}

impl StdioTransport {
    pub fn new(session: Arc<SessionContext>, github: Arc<GitHubClient>) -> Self {
        Self { session, github }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = SteampipeService::new(self.session.clone(), self.github.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        close_pool(self.session.pool()).await;
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        close_pool(self.session.pool()).await;

        if shutdown_requested {
            // stdin may still be blocked in a read that select! cannot interrupt.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
