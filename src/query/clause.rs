//! Clause Builders
//!
//! Each SQL clause has its own small intermediate representation, built from
//! the request and rendered independently:
//!
//! ```text
//! SelectClause  → "SELECT <dims>, <measures>"
//! FromClause    → " FROM <table>"
//! WhereClause   → " WHERE <p1> AND <p2> ..."      + params
//! GroupByClause → " GROUP BY <grouping exprs>"
//! OrderByClause → " ORDER BY <target> ASC|DESC, ..."
//! LimitClause   → " LIMIT n OFFSET m"
//! ```
//!
//! A clause with nothing to say renders as an empty [`Fragment`]. Only the
//! WHERE clause carries parameters, and each predicate pushes its params in
//! the same step that writes its placeholders.

use crate::query::ast::{
    Aggregation, AnalyticsRequest, DimensionType, Direction, Filter, FilterType, FilterValue,
    Interval, Literal,
};
use crate::query::error::CompileError;
use crate::query::params::{ParamList, SqlParam};

/// Rendered SQL text of one clause and the parameters its placeholders bind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: ParamList,
}

impl Fragment {
    /// Text-only fragment
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: ParamList::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// A renderable SQL clause
pub trait Clause {
    fn render(&self) -> Fragment;
}

// ============================================
// Dimension expressions
// ============================================

/// Expression a dimension groups on; shared by SELECT and GROUP BY
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingExpr {
    pub field: String,
    pub bucket: Option<Interval>,
}

impl GroupingExpr {
    /// `DATE_TRUNC('<unit>', <field>)` for bucketed fields, else the field
    pub fn render(&self) -> String {
        match self.bucket {
            Some(interval) => format!("DATE_TRUNC('{}', {})", interval.unit(), self.field),
            None => self.field.clone(),
        }
    }
}

// ============================================
// SELECT
// ============================================

/// One projected column
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// A dimension; `format` is set only for bucketed time dimensions
    Dimension {
        expr: GroupingExpr,
        format: Option<String>,
        alias: Option<String>,
    },
    /// An aggregated measure
    Measure {
        agg: Aggregation,
        field: String,
        alias: Option<String>,
    },
}

impl SelectItem {
    /// Original request field
    pub fn source_field(&self) -> &str {
        match self {
            Self::Dimension { expr, .. } => &expr.field,
            Self::Measure { field, .. } => field,
        }
    }

    /// Output alias, if any
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Dimension { alias, .. } | Self::Measure { alias, .. } => alias.as_deref(),
        }
    }

    /// Render the projection expression with its alias
    pub fn render(&self) -> String {
        let expr = match self {
            Self::Dimension {
                expr,
                format: Some(format),
                ..
            } => format!("TO_CHAR({}, '{}')", expr.render(), format),
            Self::Dimension { expr, .. } => expr.render(),
            Self::Measure { agg, field, .. } => format!("{}({})", agg.keyword(), field),
        };

        match self.alias() {
            Some(alias) => format!("{expr} AS {alias}"),
            None => expr,
        }
    }
}

/// SELECT list: dimensions first, then measures
#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub items: Vec<SelectItem>,
}

impl SelectClause {
    pub fn build(request: &AnalyticsRequest) -> Result<Self, CompileError> {
        let mut items = Vec::with_capacity(request.dimensions.len() + request.measures.len());

        for dimension in &request.dimensions {
            let bucket = dimension.bucket();
            if dimension.kind == DimensionType::Time && bucket.is_none() {
                tracing::warn!(
                    field = %dimension.field,
                    "time dimension without interval, grouping on the raw column"
                );
            }

            let format = match bucket {
                Some(_) => Some(checked_format(&dimension.field, dimension.date_format())?),
                None => None,
            };

            items.push(SelectItem::Dimension {
                expr: GroupingExpr {
                    field: dimension.field.clone(),
                    bucket,
                },
                format,
                alias: dimension.alias().map(str::to_string),
            });
        }

        for measure in &request.measures {
            items.push(SelectItem::Measure {
                agg: measure.agg,
                field: measure.field.clone(),
                alias: measure.alias().map(str::to_string),
            });
        }

        Ok(Self { items })
    }

    /// Name an ORDER BY entry should use for `field`
    ///
    /// Matches an alias first, then an aliased item's original field. Falls
    /// back to the field itself.
    pub fn resolve_order_target<'a>(&'a self, field: &'a str) -> &'a str {
        if let Some(alias) = self.items.iter().filter_map(|i| i.alias()).find(|a| *a == field) {
            return alias;
        }
        self.items
            .iter()
            .find(|i| i.source_field() == field)
            .and_then(|i| i.alias())
            .unwrap_or(field)
    }
}

impl Clause for SelectClause {
    fn render(&self) -> Fragment {
        let items: Vec<String> = self.items.iter().map(SelectItem::render).collect();
        Fragment::text(format!("SELECT {}", items.join(", ")))
    }
}

/// Reject templates that would break out of the SQL string literal
fn checked_format(field: &str, format: &str) -> Result<String, CompileError> {
    if format.contains(['\'', '\\', ';']) {
        return Err(CompileError::InvalidFormat {
            field: field.to_string(),
            format: format.to_string(),
        });
    }
    Ok(format.to_string())
}

// ============================================
// FROM
// ============================================

/// Source table
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: String,
}

impl FromClause {
    pub fn build(request: &AnalyticsRequest) -> Self {
        Self {
            table: request.table_name.trim().to_string(),
        }
    }
}

impl Clause for FromClause {
    fn render(&self) -> Fragment {
        Fragment::text(format!(" FROM {}", self.table))
    }
}

// ============================================
// WHERE
// ============================================

/// Comparison operators that bind a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// One WHERE predicate with its bound values
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <op> ?`
    Compare {
        field: String,
        op: Comparison,
        value: SqlParam,
    },
    /// `field LIKE ?`
    Like { field: String, pattern: SqlParam },
    /// `field BETWEEN ? AND ?`
    Between {
        field: String,
        low: SqlParam,
        high: SqlParam,
    },
    /// `field [NOT] IN (?, ...)`
    InList {
        field: String,
        negated: bool,
        values: Vec<SqlParam>,
    },
    /// `field IS NULL`
    IsNull { field: String },
}

impl Predicate {
    /// Build the predicate for one request filter
    pub fn from_filter(filter: &Filter) -> Result<Self, CompileError> {
        let field = filter.field.clone();
        let name = || format!("{:?}", filter.filter_type);

        let compare = |op: Comparison| -> Result<Self, CompileError> {
            let literal = single_value(filter)?;
            Ok(Self::Compare {
                value: SqlParam::from_literal(&filter.field, literal)?,
                field: field.clone(),
                op,
            })
        };
        let like = |prefix: &str, suffix: &str| -> Result<Self, CompileError> {
            let literal = single_value(filter)?;
            Ok(Self::Like {
                pattern: SqlParam::pattern(&filter.field, literal, prefix, suffix)?,
                field: field.clone(),
            })
        };

        match filter.filter_type {
            FilterType::Equals => compare(Comparison::Eq),
            FilterType::NotEquals => compare(Comparison::Ne),
            FilterType::GreaterThan => compare(Comparison::Gt),
            FilterType::GreaterThanOrEquals => compare(Comparison::Gte),
            FilterType::LessThan => compare(Comparison::Lt),
            FilterType::LessThanOrEquals => compare(Comparison::Lte),
            FilterType::Contains => like("%", "%"),
            FilterType::StartsWith => like("", "%"),
            FilterType::EndsWith => like("%", ""),
            FilterType::Between => {
                let values = required_value(filter)?.as_slice();
                let [low, high] = values else {
                    return Err(CompileError::BetweenArity {
                        field,
                        got: values.len(),
                    });
                };
                Ok(Self::Between {
                    low: SqlParam::from_literal(&filter.field, low)?,
                    high: SqlParam::from_literal(&filter.field, high)?,
                    field,
                })
            }
            FilterType::In | FilterType::NotIn => {
                let values = required_value(filter)?.as_slice();
                if values.is_empty() {
                    return Err(CompileError::EmptyValueList {
                        field,
                        filter: name(),
                    });
                }
                let values = values
                    .iter()
                    .map(|v| SqlParam::from_literal(&filter.field, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::InList {
                    negated: filter.filter_type == FilterType::NotIn,
                    field,
                    values,
                })
            }
            FilterType::Unrecognized => Ok(Self::IsNull { field }),
        }
    }

    /// Write this predicate, pushing one param per placeholder as it goes
    pub fn render_into(&self, sql: &mut String, params: &mut ParamList) {
        match self {
            Self::Compare { field, op, value } => {
                sql.push_str(&format!("{} {} ?", field, op.symbol()));
                params.push(value.clone());
            }
            Self::Like { field, pattern } => {
                sql.push_str(&format!("{field} LIKE ?"));
                params.push(pattern.clone());
            }
            Self::Between { field, low, high } => {
                sql.push_str(&format!("{field} BETWEEN ? AND ?"));
                params.push(low.clone());
                params.push(high.clone());
            }
            Self::InList {
                field,
                negated,
                values,
            } => {
                let keyword = if *negated { "NOT IN" } else { "IN" };
                let placeholders = vec!["?"; values.len()].join(", ");
                sql.push_str(&format!("{field} {keyword} ({placeholders})"));
                for value in values {
                    params.push(value.clone());
                }
            }
            Self::IsNull { field } => {
                sql.push_str(&format!("{field} IS NULL"));
            }
        }
    }
}

fn required_value(filter: &Filter) -> Result<&FilterValue, CompileError> {
    filter
        .filter_value
        .as_ref()
        .ok_or_else(|| CompileError::MissingFilterValue {
            field: filter.field.clone(),
            filter: format!("{:?}", filter.filter_type),
        })
}

fn single_value(filter: &Filter) -> Result<&Literal, CompileError> {
    match required_value(filter)? {
        FilterValue::Single(literal) => Ok(literal),
        FilterValue::List(items) => Err(CompileError::UnexpectedValueList {
            field: filter.field.clone(),
            filter: format!("{:?}", filter.filter_type),
            got: items.len(),
        }),
    }
}

/// WHERE predicates, ANDed in order: time range first, then filters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    pub predicates: Vec<Predicate>,
}

impl WhereClause {
    /// Build from the request
    ///
    /// The time range applies to the first time dimension's field, or to
    /// `default_time_column` when the request has none.
    pub fn build(
        request: &AnalyticsRequest,
        default_time_column: &str,
    ) -> Result<Self, CompileError> {
        let mut predicates = Vec::with_capacity(request.filters.len() + 1);

        if let Some(range) = &request.time_range {
            let field = request
                .time_dimension_field()
                .unwrap_or(default_time_column)
                .to_string();
            predicates.push(Predicate::Between {
                field,
                low: SqlParam::Timestamp(range.from),
                high: SqlParam::Timestamp(range.to),
            });
        }

        for filter in &request.filters {
            predicates.push(Predicate::from_filter(filter)?);
        }

        Ok(Self { predicates })
    }
}

impl Clause for WhereClause {
    fn render(&self) -> Fragment {
        if self.predicates.is_empty() {
            return Fragment::default();
        }

        let mut sql = String::from(" WHERE ");
        let mut params = ParamList::new();
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            predicate.render_into(&mut sql, &mut params);
        }
        Fragment { sql, params }
    }
}

// ============================================
// GROUP BY
// ============================================

/// Grouping expressions, one per dimension, never aliases
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupByClause {
    pub exprs: Vec<GroupingExpr>,
}

impl GroupByClause {
    /// Reuse the SELECT clause's dimension expressions, in order
    pub fn build(select: &SelectClause) -> Self {
        let exprs = select
            .items
            .iter()
            .filter_map(|item| match item {
                SelectItem::Dimension { expr, .. } => Some(expr.clone()),
                SelectItem::Measure { .. } => None,
            })
            .collect();
        Self { exprs }
    }
}

impl Clause for GroupByClause {
    fn render(&self) -> Fragment {
        if self.exprs.is_empty() {
            return Fragment::default();
        }
        let exprs: Vec<String> = self.exprs.iter().map(GroupingExpr::render).collect();
        Fragment::text(format!(" GROUP BY {}", exprs.join(", ")))
    }
}

// ============================================
// ORDER BY
// ============================================

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub target: String,
    pub direction: Direction,
}

/// Sort entries in request order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderByClause {
    pub items: Vec<OrderItem>,
}

impl OrderByClause {
    pub fn build(request: &AnalyticsRequest, select: &SelectClause) -> Result<Self, CompileError> {
        let items = request
            .orders
            .iter()
            .map(|order| -> Result<OrderItem, CompileError> {
                let direction = match order.direction.as_deref() {
                    None => Direction::Asc,
                    Some(raw) if raw.trim().is_empty() => Direction::Asc,
                    Some(raw) => {
                        Direction::parse(raw).ok_or_else(|| CompileError::InvalidDirection {
                            field: order.field.clone(),
                            direction: raw.to_string(),
                        })?
                    }
                };
                Ok(OrderItem {
                    target: select.resolve_order_target(&order.field).to_string(),
                    direction,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { items })
    }
}

impl Clause for OrderByClause {
    fn render(&self) -> Fragment {
        if self.items.is_empty() {
            return Fragment::default();
        }
        let items: Vec<String> = self
            .items
            .iter()
            .map(|i| format!("{} {}", i.target, i.direction.keyword()))
            .collect();
        Fragment::text(format!(" ORDER BY {}", items.join(", ")))
    }
}

// ============================================
// LIMIT / OFFSET
// ============================================

/// Pagination, rendered as integer literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimitClause {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitClause {
    /// Values must fit a signed 64-bit integer
    pub fn build(request: &AnalyticsRequest) -> Result<Self, CompileError> {
        Ok(Self {
            limit: in_range("limit", request.limit)?,
            offset: in_range("offset", request.offset)?,
        })
    }
}

fn in_range(name: &str, value: Option<u64>) -> Result<Option<u64>, CompileError> {
    match value {
        Some(v) if i64::try_from(v).is_err() => Err(CompileError::PaginationOutOfRange {
            name: name.to_string(),
            value: v,
        }),
        _ => Ok(value),
    }
}

impl Clause for LimitClause {
    fn render(&self) -> Fragment {
        let mut sql = String::new();
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Fragment::text(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::{Dimension, LiteralType, Measure, Order};
    use chrono::{TimeZone, Utc};

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    fn base() -> AnalyticsRequest {
        AnalyticsRequest::table("orders").measure(Measure::new("amount", Aggregation::Sum))
    }

    #[test]
    fn test_select_dimensions_before_measures() {
        let req = base()
            .measure(Measure::new("id", Aggregation::Count).with_alias("orders"))
            .dimension(Dimension::category("region").with_alias("r"));

        let select = SelectClause::build(&req).unwrap();
        assert_eq!(select.items.len(), 3);
        assert_eq!(
            select.render().sql,
            "SELECT region AS r, SUM(amount), COUNT(id) AS orders"
        );
    }

    #[test]
    fn test_select_time_dimension_default_format() {
        let req = base().dimension(Dimension::time("created_at", Interval::Month).with_alias("month"));

        let select = SelectClause::build(&req).unwrap();
        assert_eq!(
            select.render().sql,
            "SELECT TO_CHAR(DATE_TRUNC('month', created_at), 'YYYY-MM-DD') AS month, SUM(amount)"
        );
    }

    #[test]
    fn test_select_time_dimension_custom_format() {
        let req = base().dimension(Dimension::time("created_at", Interval::Year).with_format("YYYY"));

        let select = SelectClause::build(&req).unwrap();
        assert!(select
            .render()
            .sql
            .starts_with("SELECT TO_CHAR(DATE_TRUNC('year', created_at), 'YYYY')"));
    }

    #[test]
    fn test_select_rejects_quote_in_format() {
        let req = base().dimension(
            Dimension::time("created_at", Interval::Day).with_format("YYYY'); DROP TABLE x; --"),
        );

        let err = SelectClause::build(&req).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFormat { .. }));
    }

    #[test]
    fn test_time_dimension_without_interval_is_bare() {
        let mut dim = Dimension::time("created_at", Interval::Day);
        dim.interval = None;
        let req = base().dimension(dim);

        let select = SelectClause::build(&req).unwrap();
        assert_eq!(select.render().sql, "SELECT created_at, SUM(amount)");
    }

    #[test]
    fn test_group_by_uses_expression_not_alias() {
        let req = base()
            .dimension(Dimension::time("created_at", Interval::Week).with_alias("week"))
            .dimension(Dimension::category("region").with_alias("r"));

        let select = SelectClause::build(&req).unwrap();
        let group_by = GroupByClause::build(&select);
        assert_eq!(
            group_by.render().sql,
            " GROUP BY DATE_TRUNC('week', created_at), region"
        );
    }

    #[test]
    fn test_group_by_empty_without_dimensions() {
        let select = SelectClause::build(&base()).unwrap();
        assert!(GroupByClause::build(&select).render().is_empty());
    }

    #[test]
    fn test_where_empty() {
        let clause = WhereClause::build(&base(), "creation_date").unwrap();
        let frag = clause.render();
        assert!(frag.sql.is_empty());
        assert!(frag.params.is_empty());
    }

    #[test]
    fn test_where_time_range_uses_default_column() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let req = base().time_range(from, to);

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(frag.sql, " WHERE creation_date BETWEEN ? AND ?");
        assert_eq!(
            frag.params.as_slice(),
            &[SqlParam::Timestamp(from), SqlParam::Timestamp(to)]
        );
    }

    #[test]
    fn test_where_time_range_uses_first_time_dimension() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let req = base()
            .dimension(Dimension::category("region"))
            .dimension(Dimension::time("paid_at", Interval::Day))
            .dimension(Dimension::time("shipped_at", Interval::Day))
            .time_range(from, to);

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(frag.sql, " WHERE paid_at BETWEEN ? AND ?");
    }

    #[test]
    fn test_where_operator_table() {
        let cases = [
            (FilterType::Equals, "x = ?"),
            (FilterType::NotEquals, "x != ?"),
            (FilterType::GreaterThan, "x > ?"),
            (FilterType::GreaterThanOrEquals, "x >= ?"),
            (FilterType::LessThan, "x < ?"),
            (FilterType::LessThanOrEquals, "x <= ?"),
            (FilterType::Contains, "x LIKE ?"),
            (FilterType::StartsWith, "x LIKE ?"),
            (FilterType::EndsWith, "x LIKE ?"),
        ];

        for (filter_type, expected) in cases {
            let req = base().filter(Filter::new(
                filter_type,
                "x",
                FilterValue::single(Literal::string("v")),
            ));
            let frag = WhereClause::build(&req, "creation_date").unwrap().render();
            assert_eq!(frag.sql, format!(" WHERE {expected}"), "{filter_type:?}");
            assert_eq!(frag.params.len(), 1);
        }
    }

    #[test]
    fn test_like_patterns() {
        let req = base()
            .filter(Filter::new(FilterType::Contains, "name", FilterValue::single("ann".into())))
            .filter(Filter::new(FilterType::StartsWith, "name", FilterValue::single("ann".into())))
            .filter(Filter::new(FilterType::EndsWith, "name", FilterValue::single("ann".into())));

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(
            frag.params.as_slice(),
            &[
                SqlParam::Text("%ann%".to_string()),
                SqlParam::Text("ann%".to_string()),
                SqlParam::Text("%ann".to_string()),
            ]
        );
    }

    #[test]
    fn test_between_filter() {
        let req = base().filter(Filter::new(
            FilterType::Between,
            "amount",
            FilterValue::list([Literal::integer(10), Literal::integer(100)]),
        ));

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(frag.sql, " WHERE amount BETWEEN ? AND ?");
        assert_eq!(
            frag.params.as_slice(),
            &[SqlParam::Integer(10), SqlParam::Integer(100)]
        );
    }

    #[test]
    fn test_between_wrong_arity() {
        let req = base().filter(Filter::new(
            FilterType::Between,
            "amount",
            FilterValue::list([Literal::integer(10)]),
        ));
        let err = WhereClause::build(&req, "creation_date").unwrap_err();
        assert_eq!(
            err,
            CompileError::BetweenArity {
                field: "amount".to_string(),
                got: 1
            }
        );

        let req = base().filter(Filter::new(
            FilterType::Between,
            "amount",
            FilterValue::single(Literal::integer(10)),
        ));
        assert!(WhereClause::build(&req, "creation_date").is_err());
    }

    #[test]
    fn test_in_filter_three_values() {
        let req = base().filter(Filter::new(
            FilterType::In,
            "status",
            FilterValue::list([
                Literal::string("paid"),
                Literal::string("shipped"),
                Literal::string("done"),
            ]),
        ));

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(frag.sql, " WHERE status IN (?, ?, ?)");
        assert_eq!(
            frag.params.as_slice(),
            &[
                SqlParam::Text("paid".to_string()),
                SqlParam::Text("shipped".to_string()),
                SqlParam::Text("done".to_string()),
            ]
        );
    }

    #[test]
    fn test_not_in_single_scalar() {
        let req = base().filter(Filter::new(
            FilterType::NotIn,
            "status",
            FilterValue::single(Literal::string("void")),
        ));
        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(frag.sql, " WHERE status NOT IN (?)");
        assert_eq!(frag.params.len(), 1);
    }

    #[test]
    fn test_in_empty_list() {
        let req = base().filter(Filter::new(FilterType::In, "status", FilterValue::List(vec![])));
        assert!(matches!(
            WhereClause::build(&req, "creation_date"),
            Err(CompileError::EmptyValueList { .. })
        ));
    }

    #[test]
    fn test_scalar_operator_rejects_list() {
        let req = base().filter(Filter::new(
            FilterType::Equals,
            "status",
            FilterValue::list([Literal::string("a"), Literal::string("b")]),
        ));
        assert!(matches!(
            WhereClause::build(&req, "creation_date"),
            Err(CompileError::UnexpectedValueList { got: 2, .. })
        ));
    }

    #[test]
    fn test_missing_filter_value() {
        let mut filter = Filter::new(FilterType::Equals, "status", FilterValue::single("x".into()));
        filter.filter_value = None;
        let req = base().filter(filter);
        assert!(matches!(
            WhereClause::build(&req, "creation_date"),
            Err(CompileError::MissingFilterValue { .. })
        ));
    }

    #[test]
    fn test_unrecognized_filter_is_null() {
        let mut filter = Filter::new(FilterType::Unrecognized, "note", FilterValue::single("x".into()));
        filter.filter_value = None;
        let req = base().filter(filter);

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(frag.sql, " WHERE note IS NULL");
        assert!(frag.params.is_empty());
    }

    #[test]
    fn test_where_params_follow_placeholders() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let req = base()
            .time_range(from, to)
            .filter(Filter::new(
                FilterType::In,
                "region",
                FilterValue::list([Literal::string("eu"), Literal::string("us")]),
            ))
            .filter(Filter::new(
                FilterType::GreaterThan,
                "amount",
                FilterValue::single(Literal::typed("9.5", LiteralType::Number)),
            ));

        let frag = WhereClause::build(&req, "creation_date").unwrap().render();
        assert_eq!(
            frag.sql,
            " WHERE creation_date BETWEEN ? AND ? AND region IN (?, ?) AND amount > ?"
        );
        assert_eq!(placeholders(&frag.sql), frag.params.len());
        assert_eq!(
            frag.params.as_slice(),
            &[
                SqlParam::Timestamp(from),
                SqlParam::Timestamp(to),
                SqlParam::Text("eu".to_string()),
                SqlParam::Text("us".to_string()),
                SqlParam::Real(9.5),
            ]
        );
    }

    #[test]
    fn test_order_by_resolution() {
        let req = base()
            .measure(Measure::new("id", Aggregation::Count).with_alias("orders"))
            .dimension(Dimension::category("region").with_alias("r"))
            .order(Order::desc("orders"))
            .order(Order::asc("region"))
            .order(Order {
                field: "amount".to_string(),
                direction: None,
            });

        let select = SelectClause::build(&req).unwrap();
        let order_by = OrderByClause::build(&req, &select).unwrap();
        assert_eq!(
            order_by.render().sql,
            " ORDER BY orders DESC, r ASC, amount ASC"
        );
    }

    #[test]
    fn test_order_by_direction_case_insensitive() {
        let req = base().order(Order {
            field: "amount".to_string(),
            direction: Some("DESC".to_string()),
        });
        let select = SelectClause::build(&req).unwrap();
        let order_by = OrderByClause::build(&req, &select).unwrap();
        assert_eq!(order_by.render().sql, " ORDER BY amount DESC");
    }

    #[test]
    fn test_order_by_invalid_direction() {
        let req = base().order(Order {
            field: "amount".to_string(),
            direction: Some("sideways".to_string()),
        });
        let select = SelectClause::build(&req).unwrap();
        assert!(matches!(
            OrderByClause::build(&req, &select),
            Err(CompileError::InvalidDirection { .. })
        ));
    }

    #[test]
    fn test_limit_offset() {
        let render = |req: AnalyticsRequest| LimitClause::build(&req).unwrap().render().sql;

        assert_eq!(render(base()), "");
        assert_eq!(render(base().limit(50)), " LIMIT 50");
        assert_eq!(render(base().offset(5)), " OFFSET 5");
        assert_eq!(render(base().limit(10).offset(20)), " LIMIT 10 OFFSET 20");
        assert_eq!(
            render(base().limit(i64::MAX as u64)),
            format!(" LIMIT {}", i64::MAX)
        );
    }

    #[test]
    fn test_limit_beyond_i64_rejected() {
        let err = LimitClause::build(&base().limit(u64::MAX)).unwrap_err();
        assert_eq!(
            err,
            CompileError::PaginationOutOfRange {
                name: "limit".to_string(),
                value: u64::MAX,
            }
        );

        let err = LimitClause::build(&base().offset(i64::MAX as u64 + 1)).unwrap_err();
        assert!(matches!(err, CompileError::PaginationOutOfRange { ref name, .. } if name == "offset"));
    }
}
