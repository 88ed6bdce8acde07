//! Error types for the Steampipe MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant provides actionable messages to help AI assistants understand
//! and recover from error conditions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{resource} not initialized")]
    NotConfigured { resource: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Identity lookup failed: {message}")]
    Identity { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    /// A failure inside a named tool operation, e.g. "Failed to list tables: ...".
    #[error("{operation}: {}", .source.detail())]
    Operation {
        operation: String,
        #[source]
        source: Box<DbError>,
    },
}

impl DbError {
    /// Create a not-configured error naming the missing resource.
    pub fn not_configured(resource: impl Into<String>) -> Self {
        Self::NotConfigured {
            resource: resource.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an identity lookup error.
    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap this error under a named operation.
    ///
    /// The resulting message is `"<operation>: <cause>"`, where the cause is the
    /// bare driver or API message rather than this error's own prefix.
    pub fn within(self, operation: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            source: Box::new(self),
        }
    }

    /// The underlying message without the variant's display prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Connection { message, .. }
            | Self::Database { message, .. }
            | Self::Identity { message }
            | Self::Internal { message } => message.clone(),
            _ => self.to_string(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::Operation { source, .. } => source.suggestion(),
            _ => None,
        }
    }

    /// SQLSTATE of the underlying database error, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            Self::Operation { source, .. } => source.sql_state(),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            // The pool adapter maps this itself, with its configured limit.
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a pooled connection",
                "Raise the acquire timeout or the pool size",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and that the Steampipe service is running",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert reqwest errors raised while talking to the identity API.
impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return DbError::timeout("identity lookup", 30);
        }
        DbError::identity(err.to_string())
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        // Statement failures carry a SQLSTATE and map to invalid_params.
        if let Some(code) = err.sql_state() {
            let msg = format!("{} (SQLSTATE: {})", err, code);
            return rmcp::ErrorData::invalid_params(msg, suggestion_data(err.suggestion()));
        }

        match &err {
            DbError::NotConfigured { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some("Set DATABASE_URL and restart the server")),
            ),
            DbError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some("Consider raising the timeout or narrowing the query")),
            ),
            DbError::Identity { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some(
                    "Check that the GitHub token is valid and has not been revoked",
                )),
            ),
            _ => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}
