//! Positional parameter building for catalog queries.
//!
//! Filter values supplied by MCP clients are never spliced into SQL text. They
//! are appended as `$n` placeholders and sent alongside the statement.

/// A SQL statement plus the text parameters bound to its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    sql: String,
    params: Vec<String>,
}

impl QueryTemplate {
    /// Start from a base statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind a value to the next placeholder, appending `AND <predicate> $n`.
    ///
    /// `predicate` is the left-hand side and operator, e.g. `table_name ILIKE`.
    pub fn and_bound(mut self, predicate: &str, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self.sql
            .push_str(&format!(" AND {} ${}", predicate, self.params.len()));
        self
    }

    /// Bind a value only when it is present.
    pub fn and_bound_opt(self, predicate: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.and_bound(predicate, v),
            None => self,
        }
    }

    /// Append trailing SQL such as an `ORDER BY` clause.
    pub fn then(mut self, tail: &str) -> Self {
        self.sql.push(' ');
        self.sql.push_str(tail);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}
