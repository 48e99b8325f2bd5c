//! Execution error types
//!
//! Errors raised while running compiled queries. They are passed through to
//! the caller without reinterpretation.

use thiserror::Error;

/// Errors that can occur while executing a query
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The database rejected or failed the statement
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed (opening the database, reading scripts)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection lock was poisoned by a panicking query
    #[error("Lock error: {0}")]
    Lock(String),

    /// The blocking task running the query failed
    #[error("Task error: {0}")]
    Task(String),
}

/// Result type alias for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;
