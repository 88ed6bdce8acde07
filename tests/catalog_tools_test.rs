//! Integration tests for the query, table and plugin tools against the
//! recording mock pool.

mod common;

use common::MockPool;
use rmcp::model::CallToolResult;
use serde_json::{Value as JsonValue, json};
use steampipe_mcp_server::db::ScopedExecutor;
use steampipe_mcp_server::error::DbError;
use steampipe_mcp_server::tools::plugin::{PluginToolHandler, ShowPluginInput};
use steampipe_mcp_server::tools::query::{QueryInput, QueryToolHandler};
use steampipe_mcp_server::tools::table::{ListTablesInput, ShowTableInput, TableToolHandler};

fn tables(pool: &MockPool) -> TableToolHandler<MockPool> {
    TableToolHandler::new(ScopedExecutor::new(Some(pool.clone())))
}

fn plugins(pool: &MockPool) -> PluginToolHandler<MockPool> {
    PluginToolHandler::new(ScopedExecutor::new(Some(pool.clone())))
}

fn queries(pool: &MockPool) -> QueryToolHandler<MockPool> {
    QueryToolHandler::new(ScopedExecutor::new(Some(pool.clone())))
}

/// The single text payload a client would receive.
fn wire_text(result: CallToolResult) -> String {
    assert_eq!(result.content.len(), 1);
    result.content[0]
        .as_text()
        .expect("text content")
        .text
        .clone()
}

// =============================================================================
// steampipe_table_list
// =============================================================================

#[tokio::test]
async fn test_list_tables_unknown_schema_short_circuits() {
    let pool = MockPool::new();
    pool.respond(vec![]);

    let envelope = tables(&pool)
        .list_tables(ListTablesInput {
            schema: Some("public".to_string()),
            filter: None,
        })
        .await
        .unwrap();

    assert_eq!(envelope.as_text(), Some("Schema 'public' not found"));
    let queries = pool.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].0.contains("information_schema.schemata"));
    assert_eq!(queries[0].1, vec!["public".to_string()]);
    assert_eq!(pool.acquisitions(), pool.releases());
}

#[tokio::test]
async fn test_list_tables_binds_schema_and_filter() {
    let pool = MockPool::new();
    pool.respond(vec![json!({ "schema_name": "aws" })]).respond(vec![
        json!({ "schema": "aws", "name": "aws_s3_bucket", "description": "AWS S3 Bucket" }),
        json!({ "schema": "aws", "name": "aws_s3_object", "description": null }),
    ]);

    let envelope = tables(&pool)
        .list_tables(ListTablesInput {
            schema: Some("aws".to_string()),
            filter: Some("%s3%".to_string()),
        })
        .await
        .unwrap();

    let value = envelope.as_json().expect("json block");
    assert_eq!(value["tables"].as_array().unwrap().len(), 2);
    assert_eq!(value["tables"][0]["name"], "aws_s3_bucket");

    let queries = pool.queries();
    let (sql, params) = &queries[1];
    assert!(sql.contains("table_schema = $1"));
    assert!(sql.contains("table_name ILIKE $2"));
    assert!(!sql.contains("%s3%"));
    assert_eq!(params, &vec!["aws".to_string(), "%s3%".to_string()]);
}

#[tokio::test]
async fn test_list_tables_without_arguments_skips_schema_check() {
    let pool = MockPool::new();
    pool.respond(vec![]);

    let envelope = tables(&pool)
        .list_tables(ListTablesInput::default())
        .await
        .unwrap();

    assert_eq!(envelope.as_json(), Some(&json!({ "tables": [] })));
    let queries = pool.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].1.is_empty());
}

#[tokio::test]
async fn test_list_tables_empty_strings_mean_no_narrowing() {
    let pool = MockPool::new();
    pool.respond(vec![json!({ "schema": "aws", "name": "aws_account", "description": null })]);

    let envelope = tables(&pool)
        .list_tables(ListTablesInput {
            schema: Some(String::new()),
            filter: Some(String::new()),
        })
        .await
        .unwrap();

    assert_eq!(envelope.as_json().unwrap()["tables"].as_array().unwrap().len(), 1);
    let queries = pool.queries();
    assert_eq!(queries.len(), 1);
    assert!(!queries[0].0.contains("information_schema.schemata"));
    assert!(!queries[0].0.contains("ILIKE"));
    assert!(queries[0].1.is_empty());
}

#[tokio::test]
async fn test_list_tables_failure_is_prefixed() {
    let pool = MockPool::new();
    pool.respond_err(DbError::database(
        "permission denied for schema aws",
        Some("42501".to_string()),
        "Check grants",
    ));

    let err = tables(&pool)
        .list_tables(ListTablesInput::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to list tables: permission denied for schema aws"
    );
}

// =============================================================================
// steampipe_table_show
// =============================================================================

#[tokio::test]
async fn test_show_table_with_zero_columns() {
    let pool = MockPool::new();
    pool.respond(vec![json!({
        "schema": "public", "name": "empty_table", "type": "BASE TABLE",
        "column_name": null, "data_type": null, "is_nullable": null,
        "column_default": null, "character_maximum_length": null,
        "numeric_precision": null, "numeric_scale": null, "description": null
    })]);

    let envelope = tables(&pool)
        .show_table(ShowTableInput {
            name: "empty_table".to_string(),
            schema: None,
        })
        .await
        .unwrap();

    let value = envelope.as_json().expect("json block");
    assert_eq!(value["table"]["name"], "empty_table");
    assert_eq!(value["table"]["columns"], json!([]));
}

#[tokio::test]
async fn test_show_table_optional_fields_never_null() {
    let pool = MockPool::new();
    pool.respond(vec![
        json!({
            "schema": "aws", "name": "aws_account", "type": "FOREIGN",
            "column_name": "account_id", "data_type": "text", "is_nullable": "YES",
            "column_default": null, "character_maximum_length": null,
            "numeric_precision": null, "numeric_scale": null,
            "description": "The AWS Account ID."
        }),
        json!({
            "schema": "aws", "name": "aws_account", "type": "FOREIGN",
            "column_name": "limit", "data_type": "numeric", "is_nullable": "NO",
            "column_default": "0", "character_maximum_length": null,
            "numeric_precision": 10, "numeric_scale": 0, "description": null
        }),
    ]);

    let result: CallToolResult = tables(&pool)
        .show_table(ShowTableInput {
            name: "aws_account".to_string(),
            schema: None,
        })
        .await
        .unwrap()
        .into();
    let value: JsonValue = serde_json::from_str(&wire_text(result)).unwrap();

    let columns = value["table"]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), 2);
    for column in columns {
        for key in [
            "character_maximum_length",
            "numeric_precision",
            "numeric_scale",
            "description",
        ] {
            if let Some(v) = column.get(key) {
                assert!(!v.is_null(), "{key} serialized as null");
            }
        }
        assert!(column.get("default").is_some());
    }
    assert_eq!(columns[0]["nullable"], true);
    assert_eq!(columns[0]["description"], "The AWS Account ID.");
    assert_eq!(columns[1]["nullable"], false);
    assert_eq!(columns[1]["numeric_scale"], 0);
}

#[tokio::test]
async fn test_show_table_not_found_in_schema() {
    let pool = MockPool::new();
    pool.respond(vec![json!({ "schema_name": "aws" })]).respond(vec![]);

    let envelope = tables(&pool)
        .show_table(ShowTableInput {
            name: "aws_nothing".to_string(),
            schema: Some("aws".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(
        envelope.as_text(),
        Some("Table 'aws_nothing' not found in schema 'aws'")
    );
    let queries = pool.queries();
    assert_eq!(
        queries[1].1,
        vec!["aws".to_string(), "aws_nothing".to_string()]
    );
}

#[tokio::test]
async fn test_show_table_unknown_schema_short_circuits() {
    let pool = MockPool::new();
    pool.respond(vec![]);

    let envelope = tables(&pool)
        .show_table(ShowTableInput {
            name: "aws_account".to_string(),
            schema: Some("nope".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(envelope.as_text(), Some("Schema 'nope' not found"));
    assert_eq!(pool.queries().len(), 1);
}

#[tokio::test]
async fn test_show_table_empty_schema_searches_all_schemas() {
    let pool = MockPool::new();
    pool.respond(vec![json!({
        "schema": "aws", "name": "aws_account", "type": "FOREIGN",
        "column_name": "account_id", "data_type": "text", "is_nullable": "YES",
        "column_default": null, "character_maximum_length": null,
        "numeric_precision": null, "numeric_scale": null, "description": null
    })]);

    let envelope = tables(&pool)
        .show_table(ShowTableInput {
            name: "aws_account".to_string(),
            schema: Some(String::new()),
        })
        .await
        .unwrap();

    assert_eq!(envelope.as_json().unwrap()["table"]["schema"], "aws");
    let queries = pool.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].1, vec!["aws_account".to_string()]);
}

// =============================================================================
// steampipe_plugin_list / steampipe_plugin_show
// =============================================================================

#[tokio::test]
async fn test_list_plugins() {
    let pool = MockPool::new();
    pool.respond(vec![
        json!({ "plugin": "hub.steampipe.io/plugins/turbot/aws@latest", "version": "0.140.0" }),
        json!({ "plugin": "hub.steampipe.io/plugins/turbot/github@latest", "version": "0.44.0" }),
    ]);

    let envelope = plugins(&pool).list_plugins().await.unwrap();

    let value = envelope.as_json().expect("json block");
    assert_eq!(value["plugins"].as_array().unwrap().len(), 2);
    assert_eq!(value["plugins"][1]["version"], "0.44.0");
    assert!(pool.queries()[0].0.contains("FROM steampipe_plugin"));
}

#[tokio::test]
async fn test_show_plugin_not_found() {
    let pool = MockPool::new();
    pool.respond(vec![]);

    let envelope = plugins(&pool)
        .show_plugin(ShowPluginInput {
            name: "aws".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(envelope.as_text(), Some("Plugin 'aws' not found"));
    assert_eq!(pool.queries()[0].1, vec!["aws".to_string()]);
}

#[tokio::test]
async fn test_show_plugin_returns_first_row() {
    let pool = MockPool::new();
    pool.respond(vec![
        json!({ "plugin_instance": "aws", "plugin": "aws", "version": "0.140.0", "memory_max_mb": 1024 }),
        json!({ "plugin_instance": "aws_other", "plugin": "aws", "version": "0.140.0", "memory_max_mb": 512 }),
    ]);

    let envelope = plugins(&pool)
        .show_plugin(ShowPluginInput {
            name: "aws".to_string(),
        })
        .await
        .unwrap();

    let value = envelope.as_json().expect("json block");
    assert_eq!(value["plugin"]["plugin_instance"], "aws");
    assert_eq!(value["plugin"]["memory_max_mb"], 1024);
}

#[tokio::test]
async fn test_show_plugin_failure_is_prefixed() {
    let pool = MockPool::new();
    pool.respond_err(DbError::database(
        "relation \"steampipe_plugin\" does not exist",
        Some("42P01".to_string()),
        "Check the SQL syntax",
    ));

    let err = plugins(&pool)
        .show_plugin(ShowPluginInput {
            name: "aws".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Failed to get plugin details: "));
}

// =============================================================================
// query
// =============================================================================

#[tokio::test]
async fn test_query_returns_rows_as_json_array() {
    let pool = MockPool::new();
    pool.respond(vec![json!({ "name": "bucket-a" }), json!({ "name": "bucket-b" })]);

    let result: CallToolResult = queries(&pool)
        .query(QueryInput {
            sql: "select name from aws_s3_bucket".to_string(),
        })
        .await
        .unwrap()
        .into();

    let value: JsonValue = serde_json::from_str(&wire_text(result)).unwrap();
    assert_eq!(value, json!([{ "name": "bucket-a" }, { "name": "bucket-b" }]));
    assert_eq!(pool.queries()[0].0, "select name from aws_s3_bucket");
    assert!(pool.queries()[0].1.is_empty());
}

#[tokio::test]
async fn test_query_rows_keep_select_column_order() {
    let pool = MockPool::new();
    pool.respond(vec![json!({ "zone": "us-east-1a", "account": "123", "id": 7 })]);

    let result: CallToolResult = queries(&pool)
        .query(QueryInput {
            sql: "select zone, account, id from aws_zones".to_string(),
        })
        .await
        .unwrap()
        .into();

    let text = wire_text(result);
    let zone = text.find("\"zone\"").unwrap();
    let account = text.find("\"account\"").unwrap();
    let id = text.find("\"id\"").unwrap();
    assert!(zone < account && account < id, "column order lost: {text}");
}

#[tokio::test]
async fn test_query_invalid_sql_is_prefixed_with_driver_message() {
    let pool = MockPool::new();
    pool.respond_err(DbError::database(
        "syntax error at or near \"SELEC\"",
        Some("42601".to_string()),
        "Check the SQL syntax",
    ));

    let err = queries(&pool)
        .query(QueryInput {
            sql: "SELEC 1".to_string(),
        })
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Query execution failed: "));
    assert!(message.contains("syntax error at or near \"SELEC\""));

    let mcp_err: rmcp::ErrorData = err.into();
    assert!(mcp_err.message.starts_with("Query execution failed: "));
    assert_eq!(pool.acquisitions(), pool.releases());
}

#[tokio::test]
async fn test_tools_without_pool_report_not_initialized() {
    let handler: QueryToolHandler<MockPool> = QueryToolHandler::new(ScopedExecutor::new(None));
    let err = handler
        .query(QueryInput {
            sql: "select 1".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Database pool not initialized");
}
