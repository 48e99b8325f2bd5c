//! Analytics Service
//!
//! Ties the compiler to an executor: compile, fetch rows, count, and wrap
//! everything in response metadata.

use crate::query::{compile_count, AnalyticsRequest, CompiledQuery, QueryCompiler, QueryError};
use crate::store::{ExecutionError, Row, SqlExecutor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the full compile-and-run path
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request was rejected before any SQL ran
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The database failed the statement
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Rows plus metadata
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResponse {
    pub data: Vec<Row>,
    pub metadata: Metadata,
}

/// Describes how a response was produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Row count before pagination when a limit was set, else rows returned
    pub total_records: u64,
    pub generated_at: DateTime<Utc>,
    pub query_id: Uuid,
    pub stats: QueryStats,
}

/// The SQL that ran, for debugging
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    pub sql: String,
    /// Bind parameters rendered as `[a, b, ...]`
    pub params: String,
}

/// Compiles and runs analytics requests
#[derive(Clone)]
pub struct AnalyticsService {
    compiler: QueryCompiler,
    executor: Arc<dyn SqlExecutor>,
}

impl AnalyticsService {
    /// Create a service over an executor
    pub fn new(compiler: QueryCompiler, executor: Arc<dyn SqlExecutor>) -> Self {
        Self { compiler, executor }
    }

    /// The compiler used for every request
    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Compile a request, run it, and count the unpaginated result
    pub async fn get_analytics_data(
        &self,
        request: &AnalyticsRequest,
    ) -> Result<AnalyticsResponse, ServiceError> {
        let query_id = Uuid::new_v4();

        let compiled = self.compiler.compile(request).map_err(|e| {
            tracing::warn!(query_id = %query_id, error = %e, "Rejected analytics request");
            e
        })?;

        let result = self.run(&compiled).await;
        let (data, total_records) = result.map_err(|e| {
            tracing::error!(
                query_id = %query_id,
                sql = %compiled.sql,
                params = %compiled.params,
                error = %e,
                "Analytics query failed"
            );
            e
        })?;

        tracing::info!(
            query_id = %query_id,
            table = %request.table_name,
            rows = data.len(),
            total_records,
            "Analytics query completed"
        );

        Ok(AnalyticsResponse {
            data,
            metadata: Metadata {
                total_records,
                generated_at: Utc::now(),
                query_id,
                stats: QueryStats {
                    params: compiled.params_debug(),
                    sql: compiled.sql,
                },
            },
        })
    }

    async fn run(
        &self,
        compiled: &CompiledQuery,
    ) -> Result<(Vec<Row>, u64), ExecutionError> {
        let rows = self.executor.fetch_rows(compiled).await?;

        let total = if compiled.paginated {
            let count = self.executor.fetch_count(&compile_count(compiled)).await?;
            u64::try_from(count).unwrap_or(0)
        } else {
            rows.len() as u64
        };

        Ok((rows, total))
    }
}
