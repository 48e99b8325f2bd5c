//! Query error types
//!
//! Errors raised before any SQL reaches the database. All of them describe
//! bad input and are not retryable.

use thiserror::Error;

/// Structural problems detected before compilation starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `tableName` is missing or blank
    #[error("Table name is required")]
    MissingTable,

    /// `measures` is missing or empty
    #[error("At least one measure is required")]
    MissingMeasures,
}

/// Request shapes the compiler cannot render safely
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// BETWEEN needs exactly a low and a high value
    #[error("Between filter on '{field}' needs exactly 2 values, got {got}")]
    BetweenArity { field: String, got: usize },

    /// IN / NOT IN with nothing to compare against
    #[error("{filter} filter on '{field}' has an empty value list")]
    EmptyValueList { field: String, filter: String },

    /// A single-value operator received a list
    #[error("{filter} filter on '{field}' takes a single value, got a list of {got}")]
    UnexpectedValueList {
        field: String,
        filter: String,
        got: usize,
    },

    /// A filter without its operand
    #[error("{filter} filter on '{field}' has no filterValue")]
    MissingFilterValue { field: String, filter: String },

    /// A literal that does not parse as its declared type
    #[error("Invalid {kind} literal for '{field}': {value}")]
    InvalidLiteral {
        field: String,
        value: String,
        kind: String,
    },

    /// Sort direction other than asc/desc
    #[error("Invalid sort direction for '{field}': {direction} (use asc or desc)")]
    InvalidDirection { field: String, direction: String },

    /// Date format template that cannot be placed in a string literal
    #[error("Invalid date format for dimension '{field}': {format}")]
    InvalidFormat { field: String, format: String },

    /// LIMIT or OFFSET larger than the database can bind
    #[error("{name} {value} is out of range (max {max})", max = i64::MAX)]
    PaginationOutOfRange { name: String, value: u64 },
}

/// Errors returned by the query compiler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Request failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Request could not be compiled
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
