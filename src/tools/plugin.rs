//! Steampipe plugin tools, backed by the `steampipe_plugin` view.

use crate::db::{ConnectionPool, PooledConnection, ScopedExecutor, UnitOfWork};
use crate::error::DbResult;
use crate::tools::envelope::Envelope;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::info;

pub const LIST_PLUGINS_FAILED: &str = "Failed to list plugins";
pub const SHOW_PLUGIN_FAILED: &str = "Failed to get plugin details";

pub(crate) const LIST_PLUGINS_SQL: &str =
    "SELECT plugin, version FROM steampipe_plugin ORDER BY plugin";

pub(crate) const SHOW_PLUGIN_SQL: &str = "SELECT
    plugin_instance,
    plugin,
    version,
    memory_max_mb,
    limiters,
    file_name,
    start_line_number,
    end_line_number
FROM steampipe_plugin
WHERE plugin = $1";

/// Input for the plugin detail tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ShowPluginInput {
    /// Name of the plugin to show details for
    pub name: String,
}

#[derive(Debug, Default)]
pub struct ListPlugins;

impl<C: PooledConnection> UnitOfWork<C> for ListPlugins {
    type Output = Envelope;

    async fn run(self, conn: &mut C) -> DbResult<Envelope> {
        let rows = conn.query(LIST_PLUGINS_SQL, &[]).await?;
        info!(plugins = rows.len(), "Listed plugins");
        let plugins: Vec<JsonValue> = rows.into_iter().map(JsonValue::Object).collect();
        Ok(Envelope::json(json!({ "plugins": plugins })))
    }
}

#[derive(Debug)]
pub struct ShowPlugin {
    pub name: String,
}

impl<C: PooledConnection> UnitOfWork<C> for ShowPlugin {
    type Output = Envelope;

    async fn run(self, conn: &mut C) -> DbResult<Envelope> {
        let rows = conn
            .query(SHOW_PLUGIN_SQL, std::slice::from_ref(&self.name))
            .await?;

        // A plugin with several instances yields several rows; the first is shown.
        match rows.into_iter().next() {
            Some(plugin) => Ok(Envelope::json(json!({ "plugin": plugin }))),
            None => Ok(Envelope::text(format!("Plugin '{}' not found", self.name))),
        }
    }
}

/// Handler for the plugin tools.
#[derive(Debug, Clone)]
pub struct PluginToolHandler<P> {
    executor: ScopedExecutor<P>,
}

impl<P: ConnectionPool> PluginToolHandler<P> {
    pub fn new(executor: ScopedExecutor<P>) -> Self {
        Self { executor }
    }

    pub async fn list_plugins(&self) -> DbResult<Envelope> {
        self.executor.run(LIST_PLUGINS_FAILED, ListPlugins).await
    }

    pub async fn show_plugin(&self, input: ShowPluginInput) -> DbResult<Envelope> {
        self.executor
            .run(SHOW_PLUGIN_FAILED, ShowPlugin { name: input.name })
            .await
    }
}
