//! Request validation
//!
//! Structural checks run before any SQL is built. Identifiers are not
//! checked against a schema here.

use crate::query::ast::AnalyticsRequest;
use crate::query::error::ValidationError;

/// Check that a request names a table and at least one measure
pub fn validate(request: &AnalyticsRequest) -> Result<(), ValidationError> {
    if request.table_name.trim().is_empty() {
        return Err(ValidationError::MissingTable);
    }
    if request.measures.is_empty() {
        return Err(ValidationError::MissingMeasures);
    }
    Ok(())
}
