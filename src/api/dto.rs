//! Data Transfer Objects
//!
//! Response types that exist only at the HTTP boundary. The analytics
//! request and response bodies are the service types themselves.

use serde::Serialize;

use crate::query::{CompiledQuery, ParamList};

/// Body of `POST /api/v1/analytics/compile`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    /// Statement including pagination
    pub sql: String,
    /// Bind parameters in placeholder order
    pub params: ParamList,
    /// Unpaginated row count statement, sharing `params`
    pub count_sql: String,
}

impl CompileResponse {
    pub fn new(compiled: CompiledQuery, count: CompiledQuery) -> Self {
        Self {
            sql: compiled.sql,
            params: compiled.params,
            count_sql: count.sql,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy, unhealthy
    pub status: String,
    /// Database status
    pub database: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
