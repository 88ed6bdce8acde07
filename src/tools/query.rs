//! Query execution tool.
//!
//! This module implements the `query` MCP tool. The SQL runs verbatim inside a
//! read-only transaction that is always rolled back; there is no statement-level
//! validation.

use crate::db::{ConnectionPool, PooledConnection, ScopedExecutor, UnitOfWork};
use crate::error::DbResult;
use crate::tools::envelope::Envelope;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::info;

pub const QUERY_FAILED: &str = "Query execution failed";

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// The SQL query to execute
    pub sql: String,
}

/// Runs caller SQL as the only statement of the unit.
#[derive(Debug)]
pub struct RawQuery {
    pub sql: String,
}

impl<C: PooledConnection> UnitOfWork<C> for RawQuery {
    type Output = Envelope;

    async fn run(self, conn: &mut C) -> DbResult<Envelope> {
        let rows = conn.query(&self.sql, &[]).await?;
        info!(rows = rows.len(), "Query executed");
        Ok(Envelope::json(JsonValue::Array(
            rows.into_iter().map(JsonValue::Object).collect(),
        )))
    }
}

/// Handler for the query tool.
#[derive(Debug, Clone)]
pub struct QueryToolHandler<P> {
    executor: ScopedExecutor<P>,
}

impl<P: ConnectionPool> QueryToolHandler<P> {
    pub fn new(executor: ScopedExecutor<P>) -> Self {
        Self { executor }
    }

    /// Handle the query tool call.
    pub async fn query(&self, input: QueryInput) -> DbResult<Envelope> {
        self.executor
            .run(QUERY_FAILED, RawQuery { sql: input.sql })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_input_deserialization() {
        let input: QueryInput =
            serde_json::from_str(r#"{ "sql": "select name from aws_s3_bucket" }"#).unwrap();
        assert_eq!(input.sql, "select name from aws_s3_bucket");
    }

    #[test]
    fn test_query_input_requires_sql() {
        assert!(serde_json::from_str::<QueryInput>("{}").is_err());
    }
}
