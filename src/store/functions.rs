//! SQL date functions for SQLite
//!
//! The compiler emits PostgreSQL-style date idioms. SQLite has neither, so
//! they are registered on every connection as scalar functions:
//!
//! - `DATE_TRUNC(unit, ts)` truncates to hour/day/week/month/year and returns
//!   `YYYY-MM-DD HH:MM:SS` text
//! - `TO_CHAR(ts, template)` formats with a PostgreSQL-like template
//!
//! Timestamps are read from text (any layout [`parse_timestamp`] accepts) or
//! integer Unix seconds. NULL in gives NULL out.

use crate::query::{parse_timestamp, Interval, TIMESTAMP_FORMAT};
use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::sync::OnceLock;

/// Register `DATE_TRUNC` and `TO_CHAR` on a connection
pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("DATE_TRUNC", 2, flags, |ctx| {
        let unit: String = ctx.get(0)?;
        let Some(ts) = timestamp_arg(ctx, 1)? else {
            return Ok(None);
        };
        let truncated = Interval::parse(&unit).truncate(ts);
        Ok(Some(truncated.format(TIMESTAMP_FORMAT).to_string()))
    })?;

    conn.create_scalar_function("TO_CHAR", 2, flags, |ctx| {
        let Some(ts) = timestamp_arg(ctx, 0)? else {
            return Ok(None);
        };
        let template: String = ctx.get(1)?;
        Ok(Some(to_char(ts, &template)))
    })?;

    Ok(())
}

fn timestamp_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match ctx.get_raw(idx) {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or_else(|| user_error(format!("timestamp out of range: {secs}"))),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            parse_timestamp(&text)
                .map(Some)
                .ok_or_else(|| user_error(format!("cannot parse timestamp: {text}")))
        }
        other => Err(user_error(format!(
            "unsupported timestamp type: {:?}",
            other.data_type()
        ))),
    }
}

fn user_error(message: String) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(message.into())
}

fn template_tokens() -> &'static Regex {
    static TOKENS: OnceLock<Regex> = OnceLock::new();
    TOKENS.get_or_init(|| {
        Regex::new(r#""[^"]*"|YYYY|YY|Month|Mon|MM|DD|HH24|HH12|HH|MI|SS|AM|PM|Q"#)
            .expect("date template pattern is valid")
    })
}

/// Format a timestamp with a PostgreSQL-like template
///
/// Supported: `YYYY YY Q MM Month Mon DD HH24 HH12 HH MI SS AM PM`, and
/// double-quoted literal text. Anything else is copied as is.
pub fn to_char(ts: DateTime<Utc>, template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut last = 0;

    for m in template_tokens().find_iter(template) {
        out.push_str(&template[last..m.start()]);
        let token = m.as_str();
        match token {
            "YYYY" => out.push_str(&ts.format("%Y").to_string()),
            "YY" => out.push_str(&ts.format("%y").to_string()),
            "Q" => out.push_str(&((ts.month0() / 3) + 1).to_string()),
            "MM" => out.push_str(&ts.format("%m").to_string()),
            "Month" => out.push_str(&ts.format("%B").to_string()),
            "Mon" => out.push_str(&ts.format("%b").to_string()),
            "DD" => out.push_str(&ts.format("%d").to_string()),
            "HH24" => out.push_str(&ts.format("%H").to_string()),
            "HH12" | "HH" => out.push_str(&ts.format("%I").to_string()),
            "MI" => out.push_str(&ts.format("%M").to_string()),
            "SS" => out.push_str(&ts.format("%S").to_string()),
            "AM" | "PM" => out.push_str(&ts.format("%p").to_string()),
            quoted => out.push_str(quoted.trim_matches('"')),
        }
        last = m.end();
    }

    out.push_str(&template[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 9, 15, 4, 5).unwrap()
    }

    #[test]
    fn test_to_char_templates() {
        let ts = sample();
        assert_eq!(to_char(ts, "YYYY-MM-DD"), "2024-08-09");
        assert_eq!(to_char(ts, "DD/MM/YYYY"), "09/08/2024");
        assert_eq!(to_char(ts, "Month DD, YYYY"), "August 09, 2024");
        assert_eq!(to_char(ts, "Mon YYYY"), "Aug 2024");
        assert_eq!(to_char(ts, r#"YYYY-"Q"Q"#), "2024-Q3");
        assert_eq!(to_char(ts, "HH24:MI:SS"), "15:04:05");
        assert_eq!(to_char(ts, "HH12 PM"), "03 PM");
    }

    #[test]
    fn test_sql_functions_registered() {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();

        let truncated: String = conn
            .query_row(
                "SELECT DATE_TRUNC('month', '2024-08-09 15:04:05')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(truncated, "2024-08-01 00:00:00");

        let formatted: String = conn
            .query_row(
                "SELECT TO_CHAR(DATE_TRUNC('week', '2024-08-09T15:04:05Z'), 'YYYY-MM-DD')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(formatted, "2024-08-05");
    }

    #[test]
    fn test_sql_functions_null_and_epoch() {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();

        let null: Option<String> = conn
            .query_row("SELECT DATE_TRUNC('day', NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null, None);

        // 2024-01-01 12:00:00 UTC
        let day: String = conn
            .query_row("SELECT DATE_TRUNC('day', 1704110400)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(day, "2024-01-01 00:00:00");
    }

    #[test]
    fn test_sql_function_rejects_garbage() {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();

        let result: rusqlite::Result<String> =
            conn.query_row("SELECT DATE_TRUNC('day', 'yesterday')", [], |row| row.get(0));
        assert!(result.is_err());
    }
}
