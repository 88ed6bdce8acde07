//! MCP tool implementations.
//!
//! Database tools (all run through the scoped read-only executor):
//! - `query`: run caller SQL verbatim
//! - `steampipe_table_list`: list tables
//! - `steampipe_table_show`: describe one table
//! - `steampipe_plugin_list`: list installed plugins
//! - `steampipe_plugin_show`: describe one plugin
//!
//! Identity tool:
//! - `userInfoOctokit`: the GitHub user behind the session's token

pub mod envelope;
pub mod identity;
pub mod plugin;
pub mod query;
pub mod table;

pub use envelope::{Block, Envelope};
pub use identity::IdentityToolHandler;
pub use plugin::{ListPlugins, PluginToolHandler, ShowPlugin, ShowPluginInput};
pub use query::{QueryInput, QueryToolHandler, RawQuery};
pub use table::{
    ColumnDetail, ListTables, ListTablesInput, ShowTable, ShowTableInput, TableDetail,
    TableToolHandler,
};
