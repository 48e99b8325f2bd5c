//! Analytics Routes
//!
//! - POST /api/v1/analytics - Compile and run a request
//! - POST /api/v1/analytics/compile - Compile only, nothing is executed

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::dto::CompileResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::query::{compile_count, AnalyticsRequest};
use crate::store::Row;

/// POST /api/v1/analytics
///
/// Returns `{ data, metadata }` as JSON, or the rows as CSV when the request
/// has `"format": "csv"`.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyticsRequest>,
) -> ApiResult<Response> {
    let response = state.service.get_analytics_data(&req).await?;

    let wants_csv = req
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("csv"));

    if wants_csv {
        let body = format_csv(&response.data)?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!(
                        "attachment; filename=\"{}_{}.csv\"",
                        req.table_name,
                        response.metadata.query_id
                    ),
                ),
            ],
            Body::from(body),
        )
            .into_response());
    }

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// POST /api/v1/analytics/compile
///
/// Returns the SQL and parameters a request would run, plus its count query.
pub async fn compile_analytics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyticsRequest>,
) -> ApiResult<Json<CompileResponse>> {
    let compiled = state.service.compiler().compile(&req)?;
    let count = compile_count(&compiled);
    Ok(Json(CompileResponse::new(compiled, count)))
}

/// Render rows as CSV, header taken from the first row's columns
fn format_csv(rows: &[Row]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if let Some(first) = rows.first() {
        writer
            .write_record(first.keys())
            .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    }

    for row in rows {
        writer
            .write_record(row.values().map(csv_field))
            .map_err(|e| ApiError::Internal(format!("CSV write failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV flush failed: {}", e)))
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
