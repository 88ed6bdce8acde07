//! Steampipe MCP Server Library
//!
//! MCP (Model Context Protocol) tools for inspecting and querying a Steampipe
//! PostgreSQL endpoint. Every database interaction runs in a read-only
//! transaction that is rolled back, and tools are only registered for callers
//! whose GitHub login is on the allow-list.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod mcp;
pub mod session;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::SteampipeService;
