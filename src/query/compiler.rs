//! Query Compiler
//!
//! Validates a request, builds every clause, and renders them in one pass:
//!
//! ```text
//! validate → SELECT → FROM → WHERE → GROUP BY → ORDER BY → LIMIT/OFFSET
//! ```
//!
//! The compiler holds only configuration, so one instance can be shared
//! across threads and tasks.

use crate::query::ast::AnalyticsRequest;
use crate::query::clause::{
    Clause, FromClause, GroupByClause, LimitClause, OrderByClause, SelectClause, WhereClause,
};
use crate::query::error::QueryResult;
use crate::query::params::ParamList;
use crate::query::validator::validate;

/// Temporal column used for time ranges when no time dimension is present
pub const DEFAULT_TIME_COLUMN: &str = "creation_date";

/// SQL text paired with its ordered bind parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Full statement, including pagination
    pub sql: String,
    /// Parameters in placeholder order
    pub params: ParamList,
    /// Statement without LIMIT/OFFSET, used for counting
    pub count_base: String,
    /// Whether the request asked for a limit
    pub paginated: bool,
}

impl CompiledQuery {
    /// Number of `?` placeholders outside string literals
    pub fn placeholder_count(&self) -> usize {
        let mut in_literal = false;
        let mut count = 0;
        for c in self.sql.chars() {
            match c {
                '\'' => in_literal = !in_literal,
                '?' if !in_literal => count += 1,
                _ => {}
            }
        }
        count
    }

    /// Parameters rendered as `[a, b, ...]` for response metadata
    pub fn params_debug(&self) -> String {
        self.params.to_string()
    }
}

/// Compiles analytics requests into parameterized SQL
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    default_time_column: String,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_COLUMN)
    }
}

impl QueryCompiler {
    /// Create a compiler with a fallback temporal column
    pub fn new(default_time_column: impl Into<String>) -> Self {
        Self {
            default_time_column: default_time_column.into(),
        }
    }

    /// Fallback temporal column
    pub fn default_time_column(&self) -> &str {
        &self.default_time_column
    }

    /// Compile a request into one SELECT statement
    pub fn compile(&self, request: &AnalyticsRequest) -> QueryResult<CompiledQuery> {
        validate(request)?;

        let select = SelectClause::build(request)?;
        let from = FromClause::build(request);
        let where_clause = WhereClause::build(request, &self.default_time_column)?;
        let group_by = GroupByClause::build(&select);
        let order_by = OrderByClause::build(request, &select)?;
        let limit = LimitClause::build(request)?;

        let clauses: [&dyn Clause; 5] = [&select, &from, &where_clause, &group_by, &order_by];

        let mut sql = String::new();
        let mut params = ParamList::new();
        for clause in clauses {
            let fragment = clause.render();
            sql.push_str(&fragment.sql);
            params.append(fragment.params);
        }

        let count_base = sql.clone();
        sql.push_str(&limit.render().sql);

        tracing::debug!(
            table = %from.table,
            sql = %sql,
            params = params.len(),
            "Compiled analytics query"
        );

        Ok(CompiledQuery {
            sql,
            params,
            count_base,
            paginated: limit.limit.is_some(),
        })
    }
}

/// Compile with the default temporal column
pub fn compile(request: &AnalyticsRequest) -> QueryResult<CompiledQuery> {
    QueryCompiler::default().compile(request)
}

/// Wrap a compiled query's unpaginated SQL in a row count
///
/// LIMIT/OFFSET bind no parameters, so the original list is reused as is.
pub fn compile_count(compiled: &CompiledQuery) -> CompiledQuery {
    let sql = format!("SELECT COUNT(*) FROM ({}) AS total", compiled.count_base);
    CompiledQuery {
        count_base: sql.clone(),
        sql,
        params: compiled.params.clone(),
        paginated: false,
    }
}
