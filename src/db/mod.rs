//! Database access layer.
//!
//! - Connection pool contract and its PostgreSQL implementation
//! - Scoped read-only transaction executor
//! - Positional parameter templating
//! - Row to JSON type mapping

pub mod executor;
pub mod params;
pub mod pool;
pub mod types;

pub use executor::{ScopedExecutor, ScopedOutcome, UnitOfWork};
pub use params::QueryTemplate;
pub use pool::{ConnectionPool, PgConnectionPool, PgSession, PooledConnection};
pub use types::{JsonRow, RowToJson};
