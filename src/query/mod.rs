//! Analytics Query Compiler
//!
//! Turns a declarative [`AnalyticsRequest`] into one parameterized SQL
//! statement:
//!
//! - **AST**: request model types
//! - **Validator**: structural checks before compilation
//! - **Clauses**: one builder per SQL clause
//! - **Params**: typed bind parameters
//! - **Compiler**: sequences the clauses and derives the count query
//!
//! # Example
//!
//! ```rust
//! use analytica::query::{compile, compile_count, AnalyticsRequest, Aggregation, Measure};
//!
//! let request = AnalyticsRequest::table("orders")
//!     .measure(Measure::new("amount", Aggregation::Sum).with_alias("revenue"))
//!     .limit(10);
//!
//! let compiled = compile(&request).unwrap();
//! assert_eq!(compiled.sql, "SELECT SUM(amount) AS revenue FROM orders LIMIT 10");
//!
//! let count = compile_count(&compiled);
//! assert_eq!(count.sql, "SELECT COUNT(*) FROM (SELECT SUM(amount) AS revenue FROM orders) AS total");
//! ```
//!
//! Table and field names are written into the SQL as given. Callers must
//! restrict them to known columns before compiling.

mod ast;
mod clause;
mod compiler;
mod error;
mod params;
mod validator;

pub use ast::{
    Aggregation, AnalyticsRequest, Dimension, DimensionType, Direction, Filter, FilterType,
    FilterValue, Interval, Literal, LiteralType, Measure, Order, TimeRange, DEFAULT_DATE_FORMAT,
};
pub use clause::{
    Clause, Comparison, Fragment, FromClause, GroupByClause, GroupingExpr, LimitClause,
    OrderByClause, OrderItem, Predicate, SelectClause, SelectItem, WhereClause,
};
pub use compiler::{compile, compile_count, CompiledQuery, QueryCompiler, DEFAULT_TIME_COLUMN};
pub use error::{CompileError, QueryError, QueryResult, ValidationError};
pub use params::{parse_timestamp, ParamList, SqlParam, TIMESTAMP_FORMAT};
pub use validator::validate;
