//! Analytics Request Model
//!
//! The declarative request a caller sends to the analytics service. Every
//! type here deserializes from the camelCase JSON body:
//!
//! ```text
//! {
//!   "tableName": "orders",
//!   "measures":   [{ "field": "amount", "agg": "sum", "alias": "revenue" }],
//!   "dimensions": [{ "field": "created_at", "type": "time", "interval": "1 month" }],
//!   "filters":    [{ "filterType": "Equals", "field": "status",
//!                    "filterValue": { "value": "paid", "type": "string" } }],
//!   "timeRange":  { "from": "2024-01-01T00:00:00Z", "to": "2024-12-31T23:59:59Z" },
//!   "orders":     [{ "field": "revenue", "direction": "desc" }],
//!   "limit": 50,
//!   "offset": 0
//! }
//! ```
//!
//! Field and table names are opaque identifiers. Nothing in this module checks
//! them against a schema.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default date format template for time dimensions
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

/// A complete analytics request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRequest {
    /// Table to query
    #[serde(default)]
    pub table_name: String,
    /// Aggregated projections (at least one required)
    #[serde(default)]
    pub measures: Vec<Measure>,
    /// Grouping projections
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    /// WHERE predicates, ANDed together
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Sort order
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Window over the temporal column
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    /// Maximum number of rows
    #[serde(default)]
    pub limit: Option<u64>,
    /// Rows to skip
    #[serde(default)]
    pub offset: Option<u64>,
    /// Output format hint (json, csv); not used by the compiler
    #[serde(default)]
    pub format: Option<String>,
}

impl AnalyticsRequest {
    /// Start a request against a table
    pub fn table(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    /// Add a measure
    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    /// Add a dimension
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Add a filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a sort order
    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Restrict to a time window
    pub fn time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.time_range = Some(TimeRange { from, to });
        self
    }

    /// Set the row limit
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Field of the first time dimension, if any
    pub fn time_dimension_field(&self) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.kind == DimensionType::Time)
            .map(|d| d.field.as_str())
    }
}

/// An aggregated projection of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Column to aggregate
    pub field: String,
    /// Aggregation function
    #[serde(default)]
    pub agg: Aggregation,
    /// Output column name
    #[serde(default)]
    pub alias: Option<String>,
}

impl Measure {
    /// Create a measure
    pub fn new(field: impl Into<String>, agg: Aggregation) -> Self {
        Self {
            field: field.into(),
            agg,
            alias: None,
        }
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Alias, ignoring blank strings
    pub fn alias(&self) -> Option<&str> {
        non_blank(self.alias.as_deref())
    }
}

/// Aggregation functions a measure can use
///
/// Parsing is total: unknown names fall back to [`Aggregation::Count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    /// Parse an aggregation name, case-insensitive
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "count" => Self::Count,
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            other => {
                tracing::debug!(agg = other, "unknown aggregation, using COUNT");
                Self::Count
            }
        }
    }

    /// SQL aggregate keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.keyword().to_lowercase())
    }
}

/// A grouping projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Column to group by
    pub field: String,
    /// Output column name
    #[serde(default)]
    pub alias: Option<String>,
    /// time or category
    #[serde(rename = "type", default)]
    pub kind: DimensionType,
    /// Truncation unit for time dimensions
    #[serde(default)]
    pub interval: Option<Interval>,
    /// Date format template for time dimensions
    #[serde(default)]
    pub format: Option<String>,
}

impl Dimension {
    /// A plain column dimension
    pub fn category(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: None,
            kind: DimensionType::Category,
            interval: None,
            format: None,
        }
    }

    /// A time-bucketed dimension
    pub fn time(field: impl Into<String>, interval: Interval) -> Self {
        Self {
            field: field.into(),
            alias: None,
            kind: DimensionType::Time,
            interval: Some(interval),
            format: None,
        }
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the date format template
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Alias, ignoring blank strings
    pub fn alias(&self) -> Option<&str> {
        non_blank(self.alias.as_deref())
    }

    /// Truncation interval, only for time dimensions that carry one
    pub fn bucket(&self) -> Option<Interval> {
        match self.kind {
            DimensionType::Time => self.interval,
            DimensionType::Category => None,
        }
    }

    /// Format template, defaulting to [`DEFAULT_DATE_FORMAT`]
    pub fn date_format(&self) -> &str {
        non_blank(self.format.as_deref()).unwrap_or(DEFAULT_DATE_FORMAT)
    }
}

/// Dimension kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    /// Bucketed by a time interval
    Time,
    /// Plain column value
    #[default]
    #[serde(other)]
    Category,
}

/// Truncation units for time dimensions
///
/// Accepts both bare (`month`) and `1 month` spellings. Unknown values fall
/// back to [`Interval::Day`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hour,
    Day,
    /// Weeks start on Monday
    Week,
    Month,
    Year,
}

impl Interval {
    /// Parse an interval name
    pub fn parse(s: &str) -> Self {
        let lowered = s.trim().to_lowercase();
        let unit = lowered.strip_prefix("1 ").unwrap_or(&lowered).trim();
        match unit {
            "hour" => Self::Hour,
            "day" => Self::Day,
            "week" => Self::Week,
            "month" => Self::Month,
            "year" => Self::Year,
            other => {
                tracing::debug!(interval = other, "unknown interval, using day");
                Self::Day
            }
        }
    }

    /// Unit name passed to DATE_TRUNC
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Truncate an instant to the start of this interval
    pub fn truncate(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = |d: DateTime<Utc>| {
            d.with_hour(0)
                .and_then(|d| d.with_minute(0))
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(d)
        };

        match self {
            Self::Hour => dt
                .with_minute(0)
                .and_then(|d| d.with_second(0))
                .and_then(|d| d.with_nanosecond(0))
                .unwrap_or(dt),
            Self::Day => midnight(dt),
            Self::Week => {
                let days_since_monday = dt.weekday().num_days_from_monday() as i64;
                midnight(dt - Duration::days(days_since_monday))
            }
            Self::Month => midnight(dt.with_day(1).unwrap_or(dt)),
            Self::Year => midnight(dt.with_day(1).and_then(|d| d.with_month(1)).unwrap_or(dt)),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.unit())
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl Serialize for Interval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.unit())
    }
}

/// A WHERE-clause predicate over one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// Operator
    pub filter_type: FilterType,
    /// Column to test
    pub field: String,
    /// Literal operand(s)
    #[serde(default)]
    pub filter_value: Option<FilterValue>,
}

impl Filter {
    /// Create a filter
    pub fn new(filter_type: FilterType, field: impl Into<String>, value: FilterValue) -> Self {
        Self {
            filter_type,
            field: field.into(),
            filter_value: Some(value),
        }
    }
}

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    #[serde(alias = "EqualsFilter")]
    Equals,
    #[serde(alias = "NotEqualsFilter")]
    NotEquals,
    #[serde(alias = "GreaterThanFilter")]
    GreaterThan,
    #[serde(alias = "GreaterThanOrEqualsFilter")]
    GreaterThanOrEquals,
    #[serde(alias = "LessThanFilter")]
    LessThan,
    #[serde(alias = "LessThanOrEqualsFilter")]
    LessThanOrEquals,
    #[serde(alias = "InFilter")]
    In,
    #[serde(alias = "NotInFilter")]
    NotIn,
    #[serde(alias = "ContainsFilter")]
    Contains,
    #[serde(alias = "StartsWithFilter")]
    StartsWith,
    #[serde(alias = "EndsWithFilter")]
    EndsWith,
    #[serde(alias = "BetweenFilter")]
    Between,
    /// Any operator name not listed above; renders as `IS NULL`
    #[serde(other)]
    Unrecognized,
}

/// Operand of a filter: one literal or an ordered list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    List(Vec<Literal>),
    Single(Literal),
}

impl FilterValue {
    /// A single literal
    pub fn single(literal: Literal) -> Self {
        Self::Single(literal)
    }

    /// A list of literals
    pub fn list(literals: impl IntoIterator<Item = Literal>) -> Self {
        Self::List(literals.into_iter().collect())
    }

    /// View as a slice regardless of shape
    pub fn as_slice(&self) -> &[Literal] {
        match self {
            Self::List(items) => items,
            Self::Single(item) => std::slice::from_ref(item),
        }
    }
}

/// A typed literal value
///
/// Either `{ "value": ..., "type": ... }` or a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Typed {
        value: serde_json::Value,
        #[serde(rename = "type", default)]
        kind: Option<LiteralType>,
    },
    Bare(serde_json::Value),
}

impl Literal {
    /// A string literal
    pub fn string(value: impl Into<String>) -> Self {
        Self::Typed {
            value: serde_json::Value::String(value.into()),
            kind: Some(LiteralType::String),
        }
    }

    /// An integer literal
    pub fn integer(value: i64) -> Self {
        Self::Typed {
            value: value.into(),
            kind: Some(LiteralType::Integer),
        }
    }

    /// A literal given as text with an explicit type tag
    pub fn typed(value: impl Into<String>, kind: LiteralType) -> Self {
        Self::Typed {
            value: serde_json::Value::String(value.into()),
            kind: Some(kind),
        }
    }

    /// The raw JSON value
    pub fn value(&self) -> &serde_json::Value {
        match self {
            Self::Typed { value, .. } | Self::Bare(value) => value,
        }
    }

    /// Declared type tag, or one inferred from the JSON value
    pub fn kind(&self) -> LiteralType {
        match self {
            Self::Typed { kind: Some(kind), .. } => *kind,
            Self::Typed { value, kind: None } | Self::Bare(value) => match value {
                serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => LiteralType::Integer,
                serde_json::Value::Number(_) => LiteralType::Number,
                serde_json::Value::Bool(_) => LiteralType::Boolean,
                _ => LiteralType::String,
            },
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Bare(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Bare(value.into())
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Bare(value.into())
    }
}

/// Type tags for literal values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiteralType {
    Number,
    Integer,
    Boolean,
    Date,
    Timestamp,
    /// Text; also used for unknown tags
    #[serde(other)]
    String,
}

impl std::fmt::Display for LiteralType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Window over the temporal column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Sort specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Alias or original field of a measure/dimension
    pub field: String,
    /// `asc` or `desc`; resolved by the ORDER BY builder
    #[serde(default)]
    pub direction: Option<String>,
}

impl Order {
    /// Ascending order on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Some("asc".to_string()),
        }
    }

    /// Descending order on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Some("desc".to_string()),
        }
    }
}

/// Sort directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse a direction name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_aggregation_parse_case_insensitive() {
        assert_eq!(Aggregation::parse("SUM"), Aggregation::Sum);
        assert_eq!(Aggregation::parse("Avg"), Aggregation::Avg);
        assert_eq!(Aggregation::parse("max"), Aggregation::Max);
    }

    #[test]
    fn test_aggregation_unknown_defaults_to_count() {
        assert_eq!(Aggregation::parse("median"), Aggregation::Count);
        assert_eq!(Aggregation::parse(""), Aggregation::Count);
    }

    #[test]
    fn test_interval_parse_spellings() {
        assert_eq!(Interval::parse("month"), Interval::Month);
        assert_eq!(Interval::parse("1 month"), Interval::Month);
        assert_eq!(Interval::parse("1 HOUR"), Interval::Hour);
        assert_eq!(Interval::parse("year"), Interval::Year);
        assert_eq!(Interval::parse("fortnight"), Interval::Day);
    }

    #[test]
    fn test_interval_truncate() {
        // 2024-01-17 (Wednesday) 14:35:42 UTC
        let dt = Utc.with_ymd_and_hms(2024, 1, 17, 14, 35, 42).unwrap();

        assert_eq!(
            Interval::Hour.truncate(dt),
            Utc.with_ymd_and_hms(2024, 1, 17, 14, 0, 0).unwrap()
        );
        assert_eq!(
            Interval::Day.truncate(dt),
            Utc.with_ymd_and_hms(2024, 1, 17, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Interval::Week.truncate(dt),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Interval::Month.truncate(dt),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            Interval::Year.truncate(dt),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_deserialize_full_request() {
        let json = r#"{
            "tableName": "orders",
            "measures": [{ "field": "amount", "agg": "SUM", "alias": "revenue" }, { "field": "id" }],
            "dimensions": [{ "field": "created_at", "type": "time", "interval": "1 month" }],
            "filters": [
                { "filterType": "EqualsFilter", "field": "status",
                  "filterValue": { "value": "paid", "type": "string" } },
                { "filterType": "Between", "field": "amount", "filterValue": [10, 100] }
            ],
            "timeRange": { "from": "2024-01-01T00:00:00Z", "to": "2024-02-01T00:00:00Z" },
            "orders": [{ "field": "revenue", "direction": "desc" }],
            "limit": 50
        }"#;

        let req: AnalyticsRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.table_name, "orders");
        assert_eq!(req.measures[0].agg, Aggregation::Sum);
        assert_eq!(req.measures[1].agg, Aggregation::Count);
        assert_eq!(req.dimensions[0].kind, DimensionType::Time);
        assert_eq!(req.dimensions[0].interval, Some(Interval::Month));
        assert_eq!(req.filters[0].filter_type, FilterType::Equals);
        assert_eq!(req.filters[1].filter_type, FilterType::Between);
        assert_eq!(
            req.filters[1].filter_value.as_ref().map(|v| v.as_slice().len()),
            Some(2)
        );
        assert!(req.time_range.is_some());
        assert_eq!(req.limit, Some(50));
        assert_eq!(req.offset, None);
    }

    #[test]
    fn test_unknown_filter_type_and_dimension_type() {
        let json = r#"{
            "tableName": "t",
            "measures": [{ "field": "x" }],
            "dimensions": [{ "field": "region", "type": "geo" }],
            "filters": [{ "filterType": "IsEmpty", "field": "note" }]
        }"#;

        let req: AnalyticsRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.dimensions[0].kind, DimensionType::Category);
        assert_eq!(req.filters[0].filter_type, FilterType::Unrecognized);
        assert!(req.filters[0].filter_value.is_none());
    }

    #[test]
    fn test_unknown_literal_tag_is_string() {
        let json = r#"{
            "filterType": "Equals",
            "field": "status",
            "filterValue": { "value": "paid", "type": "uuid" }
        }"#;

        let filter: Filter = serde_json::from_str(json).unwrap();
        let value = filter.filter_value.unwrap();
        let literal = &value.as_slice()[0];

        assert_eq!(literal.kind(), LiteralType::String);
        assert_eq!(literal.value().as_str(), Some("paid"));
    }

    #[test]
    fn test_literal_kind_inference() {
        assert_eq!(Literal::from(10_i64).kind(), LiteralType::Integer);
        assert_eq!(Literal::from(1.5).kind(), LiteralType::Number);
        assert_eq!(Literal::from("x").kind(), LiteralType::String);
        assert_eq!(
            Literal::typed("2024-01-01", LiteralType::Date).kind(),
            LiteralType::Date
        );
    }

    #[test]
    fn test_blank_alias_ignored() {
        let m = Measure::new("amount", Aggregation::Sum).with_alias("  ");
        assert_eq!(m.alias(), None);

        let d = Dimension::category("region").with_alias("r");
        assert_eq!(d.alias(), Some("r"));
    }

    #[test]
    fn test_dimension_bucket_only_for_time() {
        let mut d = Dimension::category("created_at");
        d.interval = Some(Interval::Month);
        assert_eq!(d.bucket(), None);

        let t = Dimension::time("created_at", Interval::Week);
        assert_eq!(t.bucket(), Some(Interval::Week));
        assert_eq!(t.date_format(), DEFAULT_DATE_FORMAT);
    }
}
