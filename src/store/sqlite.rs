//! SQLite executor
//!
//! Runs compiled queries against a SQLite database. The connection lives
//! behind a mutex and every statement runs on Tokio's blocking pool, so the
//! async API never blocks a runtime worker.

use crate::query::{CompiledQuery, ParamList, SqlParam, TIMESTAMP_FORMAT};
use crate::store::error::{ExecutionError, ExecutionResult};
use crate::store::{functions, Row, SqlExecutor};
use async_trait::async_trait;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;
use std::sync::{Arc, Mutex};

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::Null => ToSqlOutput::Owned(SqlValue::Null),
            SqlParam::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            SqlParam::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            SqlParam::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
            SqlParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlParam::Timestamp(dt) => {
                ToSqlOutput::Owned(SqlValue::Text(dt.format(TIMESTAMP_FORMAT).to_string()))
            }
        })
    }
}

/// SQLite-backed [`SqlExecutor`]
///
/// Timestamp parameters bind as `YYYY-MM-DD HH:MM:SS` text and compare
/// lexically, so temporal columns are expected in that same form. Values
/// stored as ISO-8601 with a `T` separator sort after it and miss the
/// inclusive bounds of a time range.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> ExecutionResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        tracing::info!(path = %path.display(), "Opened analytics database");
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> ExecutionResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> ExecutionResult<Self> {
        functions::register(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a batch of statements (schema setup, seed data)
    pub async fn execute_batch(&self, sql: &str) -> ExecutionResult<()> {
        let sql = sql.to_string();
        self.with_connection(move |conn| conn.execute_batch(&sql))
            .await
    }

    /// Run a SQL script file
    pub async fn execute_script(&self, path: &Path) -> ExecutionResult<()> {
        let sql = tokio::fs::read_to_string(path).await?;
        tracing::info!(path = %path.display(), "Running database init script");
        self.execute_batch(&sql).await
    }

    async fn with_connection<T, F>(&self, f: F) -> ExecutionResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| ExecutionError::Lock(e.to_string()))?;
            f(&conn).map_err(ExecutionError::from)
        })
        .await
        .map_err(|e| ExecutionError::Task(e.to_string()))?
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn fetch_rows(&self, query: &CompiledQuery) -> ExecutionResult<Vec<Row>> {
        let sql = offset_without_limit(&query.sql, query.paginated).into_owned();
        let params = query.params.clone();
        self.with_connection(move |conn| query_rows(conn, &sql, &params))
            .await
    }

    async fn fetch_count(&self, query: &CompiledQuery) -> ExecutionResult<i64> {
        let sql = query.sql.clone();
        let params = query.params.clone();
        self.with_connection(move |conn| {
            conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
        })
        .await
    }

    async fn ping(&self) -> ExecutionResult<()> {
        self.with_connection(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map(|_| ())
    }
}

/// SQLite only accepts OFFSET after a LIMIT; `LIMIT -1` means no limit
fn offset_without_limit(sql: &str, paginated: bool) -> Cow<'_, str> {
    if paginated {
        return Cow::Borrowed(sql);
    }
    match sql.rfind(" OFFSET ") {
        Some(pos) if sql[pos + 8..].bytes().all(|b| b.is_ascii_digit()) => {
            Cow::Owned(format!("{} LIMIT -1{}", &sql[..pos], &sql[pos..]))
        }
        _ => Cow::Borrowed(sql),
    }
}

/// Execute a statement and collect rows keyed by column name
fn query_rows(conn: &Connection, sql: &str, params: &ParamList) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    for name in duplicate_columns(&columns) {
        tracing::warn!(column = %name, "Duplicate output column; later values replace earlier ones");
    }

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), json_value(row.get_ref(i)?));
        }
        out.push(record);
    }

    tracing::debug!(rows = out.len(), "Fetched analytics rows");
    Ok(out)
}

/// Names that appear more than once, each reported once
fn duplicate_columns(columns: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    let mut dups = Vec::new();
    for name in columns {
        if !seen.insert(name.as_str()) && !dups.contains(&name.as_str()) {
            dups.push(name.as_str());
        }
    }
    dups
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{
        compile, compile_count, Aggregation, AnalyticsRequest, Dimension, Filter, FilterType,
        FilterValue, Interval, Literal, Measure, Order,
    };
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    const SCHEMA: &str = "
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY,
            region TEXT NOT NULL,
            status TEXT NOT NULL,
            amount REAL NOT NULL,
            creation_date TEXT NOT NULL
        );
        INSERT INTO orders (region, status, amount, creation_date) VALUES
            ('eu', 'paid',     10.0, '2024-01-05 09:00:00'),
            ('eu', 'paid',     20.0, '2024-01-20 12:30:00'),
            ('us', 'paid',     35.0, '2024-01-21 08:00:00'),
            ('us', 'refunded',  5.0, '2024-02-02 17:45:00'),
            ('eu', 'paid',     40.0, '2024-02-11 10:00:00'),
            ('apac', 'paid',   15.0, '2024-03-01 00:00:00');
    ";

    async fn seeded() -> SqliteExecutor {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.execute_batch(SCHEMA).await.unwrap();
        executor
    }

    #[tokio::test]
    async fn test_ping() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_monthly_revenue() {
        let executor = seeded().await;
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("amount", Aggregation::Sum).with_alias("revenue"))
            .dimension(Dimension::time("creation_date", Interval::Month).with_alias("month"))
            .filter(Filter::new(
                FilterType::Equals,
                "status",
                FilterValue::single(Literal::string("paid")),
            ))
            .order(Order::asc("month"));

        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["month"], "2024-01-01");
        assert_eq!(rows[0]["revenue"], 65.0);
        assert_eq!(rows[1]["month"], "2024-02-01");
        assert_eq!(rows[1]["revenue"], 40.0);
        assert_eq!(rows[2]["month"], "2024-03-01");

        // columns keep SELECT order
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["month", "revenue"]);
    }

    #[tokio::test]
    async fn test_time_range_and_in_filter() {
        let executor = seeded().await;
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("id", Aggregation::Count).with_alias("orders"))
            .dimension(Dimension::category("region"))
            .filter(Filter::new(
                FilterType::In,
                "region",
                FilterValue::list([Literal::string("eu"), Literal::string("us")]),
            ))
            .time_range(from, to)
            .order(Order::asc("region"));

        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["region"], "eu");
        assert_eq!(rows[0]["orders"], 2);
        assert_eq!(rows[1]["region"], "us");
        assert_eq!(rows[1]["orders"], 1);
    }

    #[tokio::test]
    async fn test_count_ignores_pagination() {
        let executor = seeded().await;
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("amount", Aggregation::Sum))
            .dimension(Dimension::category("region"))
            .limit(1)
            .offset(1);

        let compiled = compile(&req).unwrap();
        let rows = executor.fetch_rows(&compiled).await.unwrap();
        let total = executor.fetch_count(&compile_count(&compiled)).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(total, 3);
    }

    #[test]
    fn test_offset_without_limit_rewrite() {
        assert_eq!(
            offset_without_limit("SELECT a FROM t OFFSET 5", false),
            "SELECT a FROM t LIMIT -1 OFFSET 5"
        );
        assert_eq!(
            offset_without_limit("SELECT a FROM t LIMIT 2 OFFSET 5", true),
            "SELECT a FROM t LIMIT 2 OFFSET 5"
        );
        assert_eq!(offset_without_limit("SELECT a FROM t", false), "SELECT a FROM t");
    }

    #[tokio::test]
    async fn test_offset_only() {
        let executor = seeded().await;
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("amount", Aggregation::Sum))
            .dimension(Dimension::category("region"))
            .order(Order::asc("region"))
            .offset(1);

        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["region"], "eu");
    }

    #[tokio::test]
    async fn test_like_and_between() {
        let executor = seeded().await;
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("id", Aggregation::Count).with_alias("n"))
            .filter(Filter::new(
                FilterType::StartsWith,
                "status",
                FilterValue::single(Literal::string("pa")),
            ))
            .filter(Filter::new(
                FilterType::Between,
                "amount",
                FilterValue::list([Literal::integer(10), Literal::integer(20)]),
            ));

        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();
        assert_eq!(rows[0]["n"], 3);
    }

    #[tokio::test]
    async fn test_time_range_bounds_are_inclusive() {
        let executor = seeded().await;
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("id", Aggregation::Count).with_alias("n"))
            .time_range(at, at);

        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();
        assert_eq!(rows[0]["n"], 1);
    }

    #[test]
    fn test_duplicate_columns() {
        let columns: Vec<String> = ["x", "region", "x", "x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(duplicate_columns(&columns), ["x"]);
        assert!(duplicate_columns(&columns[1..2]).is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_alias_keeps_last_value() {
        let executor = seeded().await;
        let req = AnalyticsRequest::table("orders")
            .measure(Measure::new("id", Aggregation::Count).with_alias("x"))
            .measure(Measure::new("amount", Aggregation::Max).with_alias("x"));

        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["x"], 40.0);
    }

    #[tokio::test]
    async fn test_bad_sql_surfaces_error() {
        let executor = seeded().await;
        let req = AnalyticsRequest::table("missing_table").measure(Measure::new("id", Aggregation::Count));

        let err = executor
            .fetch_rows(&compile(&req).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Database(_)));
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("analytics.db");

        let executor = SqliteExecutor::open(&path).unwrap();
        executor.execute_batch(SCHEMA).await.unwrap();
        assert!(path.exists());

        let req = AnalyticsRequest::table("orders").measure(Measure::new("id", Aggregation::Count));
        let rows = executor.fetch_rows(&compile(&req).unwrap()).await.unwrap();
        assert_eq!(rows[0]["COUNT(id)"], 6);
    }
}
