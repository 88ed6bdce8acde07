//! HTTP transport with Streamable HTTP support for the MCP server.
//!
//! Every MCP session gets its own `SteampipeService`, built from the identity
//! of the caller whose Bearer token opened the session.

use crate::auth::{current_caller, resolve_caller};
use crate::error::{DbError, DbResult};
use crate::mcp::SteampipeService;
use crate::session::CallerResolver;
use crate::transport::{Transport, close_pool, wait_for_signal};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// SSE connections may keep the server alive indefinitely after a shutdown
/// signal; past this the server is dropped.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport implementation with Streamable HTTP support.
pub struct HttpTransport {
    resolver: Arc<CallerResolver>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// MCP endpoint path
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        resolver: Arc<CallerResolver>,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the MCP endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The MCP service behind the caller-resolving middleware.
    pub fn router(&self) -> axum::Router {
        let github = self.resolver.github().clone();
        let service = StreamableHttpService::new(
            move || {
                let session = current_caller().ok_or_else(|| {
                    std::io::Error::other("MCP session opened without a resolved caller")
                })?;
                Ok(SteampipeService::new(session, github.clone()))
            },
            LocalSessionManager::default().into(),
            Default::default(),
        );

        // nest_service does not accept the root path.
        let app = if self.endpoint == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(&self.endpoint, service)
        };

        app.layer(axum::middleware::from_fn_with_state(
            self.resolver.clone(),
            resolve_caller,
        ))
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting MCP server with HTTP transport on {}", bind_addr);

        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(endpoint = %self.endpoint, "MCP endpoint ready");

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();
        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Server finishing on its own vs. timeout or second signal after shutdown began.
        let result = tokio::select! {
            result = server => {
                match result {
                    Ok(()) => {
                        info!("HTTP server stopped");
                        Ok(())
                    }
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        Err(DbError::internal(format!("HTTP server error: {}", e)))
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for connections to close (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => Ok(()),
        };

        close_pool(self.resolver.pool()).await;
        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
