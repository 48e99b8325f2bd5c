//! Bind parameters
//!
//! Every `?` a clause renders is paired with exactly one [`SqlParam`] pushed
//! in the same step, so a clause's placeholders and its [`ParamList`] always
//! line up left to right.

use crate::query::ast::{Literal, LiteralType};
use crate::query::error::CompileError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Text representation used for timestamp parameters
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A typed value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    #[serde(serialize_with = "serialize_timestamp")]
    Timestamp(DateTime<Utc>),
}

fn serialize_timestamp<S: serde::Serializer>(
    dt: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&dt.format(TIMESTAMP_FORMAT).to_string())
}

impl SqlParam {
    /// Convert a request literal into a parameter
    ///
    /// `field` is only used to name the filter in errors.
    pub fn from_literal(field: &str, literal: &Literal) -> Result<Self, CompileError> {
        let kind = literal.kind();
        let value = literal.value();
        let invalid = || CompileError::InvalidLiteral {
            field: field.to_string(),
            value: value.to_string(),
            kind: kind.to_string(),
        };

        if value.is_null() {
            return Ok(Self::Null);
        }

        match kind {
            LiteralType::String => scalar_text(value).map(Self::Text).ok_or_else(invalid),
            LiteralType::Integer => match value {
                Value::Number(n) => n.as_i64().map(Self::Integer).ok_or_else(invalid),
                Value::String(s) => s.trim().parse().map(Self::Integer).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            LiteralType::Number => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(Self::Integer)
                    .or_else(|| n.as_f64().map(Self::Real))
                    .ok_or_else(invalid),
                Value::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .map(Self::Integer)
                        .or_else(|_| s.parse::<f64>().map(Self::Real))
                        .map_err(|_| invalid())
                }
                _ => Err(invalid()),
            },
            LiteralType::Boolean => match value {
                Value::Bool(b) => Ok(Self::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(Self::Bool(false)),
                    Some(1) => Ok(Self::Bool(true)),
                    _ => Err(invalid()),
                },
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" => Ok(Self::Bool(true)),
                    "false" | "0" => Ok(Self::Bool(false)),
                    _ => Err(invalid()),
                },
                _ => Err(invalid()),
            },
            LiteralType::Date | LiteralType::Timestamp => value
                .as_str()
                .and_then(parse_timestamp)
                .map(Self::Timestamp)
                .ok_or_else(invalid),
        }
    }

    /// Text parameter for a LIKE pattern, wrapping the literal's text
    pub fn pattern(
        field: &str,
        literal: &Literal,
        prefix: &str,
        suffix: &str,
    ) -> Result<Self, CompileError> {
        let text = scalar_text(literal.value()).ok_or_else(|| CompileError::InvalidLiteral {
            field: field.to_string(),
            value: literal.value().to_string(),
            kind: LiteralType::String.to_string(),
        })?;
        Ok(Self::Text(format!("{prefix}{text}{suffix}")))
    }
}

impl std::fmt::Display for SqlParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Timestamp(dt) => write!(f, "{}", dt.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Timestamp(dt)
    }
}

/// Ordered parameters for one clause or a whole statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamList(Vec<SqlParam>);

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter
    pub fn push(&mut self, param: SqlParam) {
        self.0.push(param);
    }

    /// Append another clause's parameters after these
    pub fn append(&mut self, other: ParamList) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SqlParam> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[SqlParam] {
        &self.0
    }
}

impl From<Vec<SqlParam>> for ParamList {
    fn from(params: Vec<SqlParam>) -> Self {
        Self(params)
    }
}

impl<'a> IntoIterator for &'a ParamList {
    type Item = &'a SqlParam;
    type IntoIter = std::slice::Iter<'a, SqlParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for ParamList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, param) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, "]")
    }
}

/// Parse a timestamp in any of the accepted layouts
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.f]`, RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]`
/// and date-only `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
