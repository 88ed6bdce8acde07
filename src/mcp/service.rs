//! MCP service implementation using rmcp.
//!
//! Tools are declared in two routers, one per tool group. A session's router is
//! assembled from the groups its access decision permits, so an unauthorized
//! session lists no tools at all.

use crate::access::ToolGroup;
use crate::db::{PgConnectionPool, ScopedExecutor};
use crate::identity::GitHubClient;
use crate::session::SessionContext;
use crate::tools::identity::IdentityToolHandler;
use crate::tools::plugin::{PluginToolHandler, ShowPluginInput};
use crate::tools::query::{QueryInput, QueryToolHandler};
use crate::tools::table::{ListTablesInput, ShowTableInput, TableToolHandler};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct SteampipeService {
    session: Arc<SessionContext>,
    queries: QueryToolHandler<PgConnectionPool>,
    tables: TableToolHandler<PgConnectionPool>,
    plugins: PluginToolHandler<PgConnectionPool>,
    identity: IdentityToolHandler<GitHubClient>,
    /// Tool router for MCP tool dispatch, limited to the permitted groups
    tool_router: ToolRouter<Self>,
}

impl SteampipeService {
    /// Create the service for one session.
    pub fn new(session: Arc<SessionContext>, github: Arc<GitHubClient>) -> Self {
        let executor = ScopedExecutor::new(session.pool().cloned());
        let tool_router = Self::router_for(session.access().permitted_groups());
        debug!(
            identity = session.identity(),
            tools = tool_router.list_all().len(),
            "Session tool router built"
        );

        Self {
            queries: QueryToolHandler::new(executor.clone()),
            tables: TableToolHandler::new(executor.clone()),
            plugins: PluginToolHandler::new(executor),
            identity: IdentityToolHandler::new(github, session.access_token()),
            session,
            tool_router,
        }
    }

    /// Merge the routers of the given groups.
    fn router_for(groups: &[ToolGroup]) -> ToolRouter<Self> {
        groups
            .iter()
            .fold(ToolRouter::new(), |router, group| match group {
                ToolGroup::Database => router + Self::database_tool_router(),
                ToolGroup::Identity => router + Self::identity_tool_router(),
            })
    }

    /// Names of the tools this session exposes.
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

#[tool_router(router = database_tool_router)]
impl SteampipeService {
    #[tool(
        name = "query",
        description = "Run a read-only SQL query"
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        self.queries
            .query(input)
            .await
            .map(CallToolResult::from)
            .map_err(McpError::from)
    }

    #[tool(
        name = "steampipe_table_list",
        description = "List all available Steampipe tables. Use schema and filter parameters to narrow down results."
    )]
    async fn steampipe_table_list(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<CallToolResult, McpError> {
        self.tables
            .list_tables(input)
            .await
            .map(CallToolResult::from)
            .map_err(McpError::from)
    }

    #[tool(
        name = "steampipe_table_show",
        description = "Get detailed information about a specific Steampipe table, including column definitions, data types, and descriptions."
    )]
    async fn steampipe_table_show(
        &self,
        Parameters(input): Parameters<ShowTableInput>,
    ) -> Result<CallToolResult, McpError> {
        self.tables
            .show_table(input)
            .await
            .map(CallToolResult::from)
            .map_err(McpError::from)
    }

    #[tool(
        name = "steampipe_plugin_list",
        description = "List all Steampipe plugins installed on the system. Plugins provide access to different data sources like AWS, GCP, or Azure."
    )]
    async fn steampipe_plugin_list(&self) -> Result<CallToolResult, McpError> {
        self.plugins
            .list_plugins()
            .await
            .map(CallToolResult::from)
            .map_err(McpError::from)
    }

    #[tool(
        name = "steampipe_plugin_show",
        description = "Get details for a specific Steampipe plugin installation, including version, memory limits, and configuration."
    )]
    async fn steampipe_plugin_show(
        &self,
        Parameters(input): Parameters<ShowPluginInput>,
    ) -> Result<CallToolResult, McpError> {
        self.plugins
            .show_plugin(input)
            .await
            .map(CallToolResult::from)
            .map_err(McpError::from)
    }
}

#[tool_router(router = identity_tool_router)]
impl SteampipeService {
    #[tool(
        name = "userInfoOctokit",
        description = "Get user info from GitHub, via Octokit"
    )]
    async fn user_info_octokit(&self) -> Result<CallToolResult, McpError> {
        self.identity
            .user_info()
            .await
            .map(CallToolResult::from)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for SteampipeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "steampipe-mcp-server".to_owned(),
                title: Some("Steampipe MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for exploring and querying cloud resources through Steampipe.\n\
                \n\
                ## Workflow\n\
                1. Call `steampipe_plugin_list` to see which data sources are installed\n\
                2. Call `steampipe_table_list` (optionally with `schema` or an ILIKE `filter`) to find tables\n\
                3. Call `steampipe_table_show` to see a table's columns\n\
                4. Call `query` with a single PostgreSQL statement\n\
                \n\
                All statements run in a read-only transaction that is rolled back afterwards.\n\
                If no tools are listed, your GitHub login is not on the server's allow-list."
                    .to_string(),
            ),
        }
    }
}
