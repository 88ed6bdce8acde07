//! Steampipe table tools.
//!
//! `steampipe_table_list` lists tables outside the system schemas and
//! `steampipe_table_show` describes one table and its columns. Both read
//! `information_schema` through the scoped executor.

use crate::db::{ConnectionPool, JsonRow, PooledConnection, QueryTemplate, ScopedExecutor, UnitOfWork};
use crate::error::{DbError, DbResult};
use crate::tools::envelope::Envelope;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::info;

pub const LIST_TABLES_FAILED: &str = "Failed to list tables";
pub const SHOW_TABLE_FAILED: &str = "Failed to get table details";

pub(crate) const SCHEMA_EXISTS_SQL: &str =
    "SELECT schema_name::text AS schema_name FROM information_schema.schemata WHERE schema_name = $1";

const LIST_TABLES_SQL: &str = r#"SELECT DISTINCT
    table_schema::text AS "schema",
    table_name::text AS "name",
    obj_description(format('%I.%I', table_schema, table_name)::regclass::oid, 'pg_class') AS description
FROM information_schema.tables
WHERE table_schema NOT IN ('information_schema', 'pg_catalog')"#;

const SHOW_TABLE_SQL: &str = r#"SELECT
    t.table_schema::text AS "schema",
    t.table_name::text AS "name",
    t.table_type::text AS "type",
    c.column_name::text AS column_name,
    c.data_type::text AS data_type,
    c.is_nullable::text AS is_nullable,
    c.column_default::text AS column_default,
    c.character_maximum_length::int AS character_maximum_length,
    c.numeric_precision::int AS numeric_precision,
    c.numeric_scale::int AS numeric_scale,
    col_description(format('%I.%I', t.table_schema, t.table_name)::regclass::oid, c.ordinal_position::int) AS description
FROM information_schema.tables t
LEFT JOIN information_schema.columns c
    ON c.table_schema = t.table_schema
    AND c.table_name = t.table_name
WHERE t.table_schema NOT IN ('information_schema', 'pg_catalog')"#;

/// Input for the table listing tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Optional schema name to filter tables by. If not provided, lists tables from all schemas.
    #[serde(default)]
    pub schema: Option<String>,
    /// Optional filter pattern to match against table names. Use ILIKE syntax, including % as a wildcard.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Input for the table detail tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ShowTableInput {
    /// The name of the table to show details for. Can be schema qualified (e.g. 'aws_account' or 'aws.aws_account').
    pub name: String,
    /// Optional schema name. If provided, only searches in this schema. If not provided, searches across all schemas.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Column entry of a table description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDetail {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub nullable: bool,
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_maximum_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Table description returned by `steampipe_table_show`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDetail {
    pub schema: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub table_type: Option<String>,
    pub columns: Vec<ColumnDetail>,
}

fn text(row: &JsonRow, key: &str) -> Option<String> {
    row.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

fn int(row: &JsonRow, key: &str) -> Option<i64> {
    row.get(key).and_then(JsonValue::as_i64)
}

impl ColumnDetail {
    /// A column entry from one joined row; `None` for the row a table with no
    /// columns produces.
    fn from_row(row: &JsonRow) -> Option<Self> {
        Some(Self {
            name: text(row, "column_name")?,
            data_type: text(row, "data_type"),
            nullable: text(row, "is_nullable").as_deref() == Some("YES"),
            default: text(row, "column_default"),
            character_maximum_length: int(row, "character_maximum_length"),
            numeric_precision: int(row, "numeric_precision"),
            numeric_scale: int(row, "numeric_scale"),
            description: text(row, "description"),
        })
    }
}

impl TableDetail {
    /// Fold joined rows into one table. Rows belonging to a second schema with
    /// the same table name are dropped; the first schema in sort order wins.
    pub fn from_rows(rows: &[JsonRow]) -> Option<Self> {
        let first = rows.first()?;
        let schema = text(first, "schema");
        let name = text(first, "name");
        let columns = rows
            .iter()
            .filter(|row| text(row, "schema") == schema && text(row, "name") == name)
            .filter_map(ColumnDetail::from_row)
            .collect();

        Some(Self {
            table_type: text(first, "type"),
            schema,
            name,
            columns,
        })
    }
}

/// Returns the not-found text when `schema` is given and does not exist.
async fn missing_schema<C: PooledConnection>(
    conn: &mut C,
    schema: Option<&str>,
) -> DbResult<Option<String>> {
    let Some(schema) = schema else {
        return Ok(None);
    };
    let found = conn
        .query(SCHEMA_EXISTS_SQL, &[schema.to_string()])
        .await?;
    Ok(found
        .is_empty()
        .then(|| format!("Schema '{}' not found", schema)))
}

/// Lists tables, optionally narrowed by schema and name pattern.
#[derive(Debug, Default)]
pub struct ListTables {
    pub schema: Option<String>,
    pub filter: Option<String>,
}

impl ListTables {
    pub fn template(&self) -> QueryTemplate {
        QueryTemplate::new(LIST_TABLES_SQL)
            .and_bound_opt("table_schema =", self.schema.as_deref())
            .and_bound_opt("table_name ILIKE", self.filter.as_deref())
            .then(r#"ORDER BY "schema", "name""#)
    }
}

impl<C: PooledConnection> UnitOfWork<C> for ListTables {
    type Output = Envelope;

    async fn run(self, conn: &mut C) -> DbResult<Envelope> {
        if let Some(message) = missing_schema(conn, self.schema.as_deref()).await? {
            return Ok(Envelope::text(message));
        }

        let template = self.template();
        let rows = conn.query(template.sql(), template.params()).await?;
        info!(tables = rows.len(), "Listed tables");

        let tables: Vec<JsonValue> = rows.into_iter().map(JsonValue::Object).collect();
        Ok(Envelope::json(json!({ "tables": tables })))
    }
}

/// Describes one table and its columns.
#[derive(Debug)]
pub struct ShowTable {
    pub name: String,
    pub schema: Option<String>,
}

impl ShowTable {
    pub fn template(&self) -> QueryTemplate {
        QueryTemplate::new(SHOW_TABLE_SQL)
            .and_bound_opt("t.table_schema =", self.schema.as_deref())
            .and_bound("t.table_name =", self.name.as_str())
            .then("ORDER BY t.table_schema, c.ordinal_position")
    }

    fn not_found(&self) -> String {
        match &self.schema {
            Some(schema) => format!("Table '{}' not found in schema '{}'", self.name, schema),
            None => format!("Table '{}' not found", self.name),
        }
    }
}

impl<C: PooledConnection> UnitOfWork<C> for ShowTable {
    type Output = Envelope;

    async fn run(self, conn: &mut C) -> DbResult<Envelope> {
        if let Some(message) = missing_schema(conn, self.schema.as_deref()).await? {
            return Ok(Envelope::text(message));
        }

        let template = self.template();
        let rows = conn.query(template.sql(), template.params()).await?;
        let Some(table) = TableDetail::from_rows(&rows) else {
            return Ok(Envelope::text(self.not_found()));
        };
        info!(table = %self.name, columns = table.columns.len(), "Described table");

        let table = serde_json::to_value(table)
            .map_err(|e| DbError::internal(format!("Failed to serialize table: {}", e)))?;
        Ok(Envelope::json(json!({ "table": table })))
    }
}

/// Handler for the table tools.
/// An empty string counts as not given.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct TableToolHandler<P> {
    executor: ScopedExecutor<P>,
}

impl<P: ConnectionPool> TableToolHandler<P> {
    pub fn new(executor: ScopedExecutor<P>) -> Self {
        Self { executor }
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<Envelope> {
        let work = ListTables {
            schema: non_empty(input.schema),
            filter: non_empty(input.filter),
        };
        self.executor.run(LIST_TABLES_FAILED, work).await
    }

    pub async fn show_table(&self, input: ShowTableInput) -> DbResult<Envelope> {
        let work = ShowTable {
            name: input.name,
            schema: non_empty(input.schema),
        };
        self.executor.run(SHOW_TABLE_FAILED, work).await
    }
}
