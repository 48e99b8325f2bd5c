//! # Analytica
//!
//! Analytics query service. Clients describe what they want (measures,
//! dimensions, filters, a time range, ordering and pagination) as a JSON
//! document, and Analytica compiles it into one parameterized SQL `SELECT`,
//! runs it, and returns rows with metadata.
//!
//! ## Modules
//!
//! - [`query`]: request model and SQL compiler
//! - [`store`]: executor trait and the SQLite backend
//! - [`service`]: compile, execute, count
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust
//! use analytica::query::{Aggregation, AnalyticsRequest, Dimension, Interval, Measure, QueryCompiler};
//!
//! let request = AnalyticsRequest::table("orders")
//!     .measure(Measure::new("amount", Aggregation::Sum).with_alias("revenue"))
//!     .dimension(Dimension::time("created_at", Interval::Month).with_alias("month"));
//!
//! let compiled = QueryCompiler::default().compile(&request).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT TO_CHAR(DATE_TRUNC('month', created_at), 'YYYY-MM-DD') AS month, \
//!      SUM(amount) AS revenue FROM orders GROUP BY DATE_TRUNC('month', created_at)"
//! );
//! ```

pub mod api;
pub mod config;
pub mod query;
pub mod service;
pub mod store;

// Re-export top-level types for convenience
pub use query::{
    compile, compile_count, AnalyticsRequest, CompileError, CompiledQuery, QueryCompiler,
    QueryError, ValidationError,
};

pub use store::{ExecutionError, SqlExecutor, SqliteExecutor};

pub use service::{AnalyticsResponse, AnalyticsService, Metadata, ServiceError};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
