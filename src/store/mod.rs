//! Query execution
//!
//! The compiler only produces SQL. This module runs it:
//!
//! - [`SqlExecutor`]: the seam between the service and a database
//! - [`SqliteExecutor`]: bundled SQLite implementation
//! - [`functions`]: `DATE_TRUNC` / `TO_CHAR` for SQLite

mod error;
pub mod functions;
mod sqlite;

pub use error::{ExecutionError, ExecutionResult};
pub use sqlite::SqliteExecutor;

use crate::query::CompiledQuery;
use async_trait::async_trait;

/// One result row, columns in SELECT order
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Runs compiled statements against a database
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a statement and return every row
    async fn fetch_rows(&self, query: &CompiledQuery) -> ExecutionResult<Vec<Row>>;

    /// Run a statement that yields a single integer
    async fn fetch_count(&self, query: &CompiledQuery) -> ExecutionResult<i64>;

    /// Check the database is reachable
    async fn ping(&self) -> ExecutionResult<()>;
}
