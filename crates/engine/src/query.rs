//! Record-agnostic list queries: filters, sort and pagination.
//!
//! A [`ListQuery`] is built from query-string pairs and later resolved
//! against a concrete record type, which knows the storage column and value
//! kind of each API field.
//!
//! Filter keys use a prefix convention to select the comparison operator:
//!
//! | key             | operator                                       |
//! |-----------------|------------------------------------------------|
//! | `field`         | equality                                       |
//! | `gte_field`     | greater than or equal                          |
//! | `lte_field`     | less than or equal                             |
//! | `ilike_field`   | `LIKE` ignoring ASCII case (text fields only)  |
//!
//! `sort`, `order`, `page` and `limit` are reserved.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    ILike,
}

impl FilterOp {
    /// Split a query-string key into operator and field name.
    pub fn split_key(key: &str) -> (Self, &str) {
        if let Some(field) = key.strip_prefix("gte_") {
            (Self::Gte, field)
        } else if let Some(field) = key.strip_prefix("lte_") {
            (Self::Lte, field)
        } else if let Some(field) = key.strip_prefix("ilike_") {
            (Self::ILike, field)
        } else {
            (Self::Eq, key)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl TryFrom<&str> for SortDirection {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(EngineError::InvalidQuery(format!(
                "invalid order '{other}': expected asc or desc"
            ))),
        }
    }
}

/// One filter as received from the caller; the value is still a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    pub fn ilike(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::ILike, value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.limit)
    }
}

/// Filters, sort and pagination for a `find_all` call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub pagination: Option<Pagination>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn paginate(mut self, page: u64, limit: u64) -> Self {
        self.pagination = Some(Pagination { page, limit });
        self
    }

    /// Build a query from query-string pairs.
    ///
    /// Pairs with an empty value are ignored. Pagination is enabled as soon
    /// as `page` or `limit` is present.
    pub fn from_params<I, K, V>(params: I) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        let mut sort_field: Option<String> = None;
        let mut direction: Option<SortDirection> = None;
        let mut page: Option<u64> = None;
        let mut limit: Option<u64> = None;

        for (key, value) in params {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            match key {
                "sort" => sort_field = Some(value.to_string()),
                "order" => direction = Some(SortDirection::try_from(value)?),
                "page" => page = Some(parse_positive(value, "page")?),
                "limit" => limit = Some(parse_positive(value, "limit")?),
                _ => {
                    let (op, field) = FilterOp::split_key(key);
                    if field.is_empty() {
                        return Err(EngineError::InvalidQuery(format!(
                            "missing field name in '{key}'"
                        )));
                    }
                    query.filters.push(Filter::new(field, op, value));
                }
            }
        }

        if let Some(field) = sort_field {
            query.sort = Some(Sort {
                field,
                direction: direction.unwrap_or_default(),
            });
        }

        if page.is_some() || limit.is_some() {
            let limit = limit.unwrap_or(DEFAULT_LIMIT);
            if limit > MAX_LIMIT {
                return Err(EngineError::InvalidQuery(format!(
                    "limit must be at most {MAX_LIMIT}"
                )));
            }
            query.pagination = Some(Pagination {
                page: page.unwrap_or(DEFAULT_PAGE),
                limit,
            });
        }

        Ok(query)
    }

    /// Resolve field names and values against a record type.
    pub(crate) fn resolve<R: Record>(&self) -> ResultEngine<ResolvedQuery> {
        let conditions = self
            .filters
            .iter()
            .map(Condition::resolve::<R>)
            .collect::<ResultEngine<Vec<_>>>()?;

        let sort = match &self.sort {
            Some(sort) => {
                let spec = field_spec::<R>(&sort.field)?;
                (spec.column, sort.direction)
            }
            None => {
                let (field, direction) = R::DEFAULT_SORT;
                (field_spec::<R>(field)?.column, direction)
            }
        };

        if let Some(pagination) = self.pagination
            && (pagination.page == 0 || pagination.limit == 0 || pagination.limit > MAX_LIMIT)
        {
            return Err(EngineError::InvalidQuery(format!(
                "page must be >= 1 and limit within 1..={MAX_LIMIT}"
            )));
        }

        Ok(ResolvedQuery {
            conditions,
            sort,
            pagination: self.pagination,
        })
    }
}

fn parse_positive(value: &str, label: &str) -> ResultEngine<u64> {
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(EngineError::InvalidQuery(format!(
            "{label} must be a positive integer"
        ))),
    }
}

fn field_spec<R: Record>(field: &str) -> ResultEngine<FieldSpec> {
    R::field(field).ok_or_else(|| {
        EngineError::InvalidQuery(format!("unknown field '{field}' for {}", R::COLLECTION))
    })
}

/// How an API field is stored and compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Money,
    Integer,
    Date,
    Timestamp,
    Bool,
    Id,
}

impl FieldKind {
    /// Parse a raw query-string value into a typed value.
    pub fn parse(self, raw: &str) -> ResultEngine<FieldValue> {
        let invalid = |expected: &str| {
            EngineError::InvalidQuery(format!("invalid value '{raw}': expected {expected}"))
        };
        match self {
            Self::Text => Ok(FieldValue::Text(raw.to_string())),
            Self::Money => raw
                .parse::<Money>()
                .map(|money| FieldValue::Integer(money.cents()))
                .map_err(|_| invalid("a decimal amount")),
            Self::Integer => raw
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| invalid("an integer")),
            Self::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| invalid("a YYYY-MM-DD date")),
            Self::Timestamp => parse_timestamp(raw)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| invalid("an RFC 3339 timestamp or YYYY-MM-DD date")),
            Self::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(invalid("true or false")),
            },
            Self::Id => Uuid::parse_str(raw)
                .map(|id| FieldValue::Text(id.to_string()))
                .map_err(|_| invalid("a UUID")),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Storage column and kind of an API field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(column: &'static str, kind: FieldKind) -> Self {
        Self { column, kind }
    }
}

/// A typed value, comparable across records of the same field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Bool(bool),
}

impl FieldValue {
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<FieldValue> for sea_orm::Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(v) => v.into(),
            FieldValue::Integer(v) => v.into(),
            FieldValue::Date(v) => v.into(),
            FieldValue::Timestamp(v) => v.into(),
            FieldValue::Bool(v) => v.into(),
        }
    }
}

/// A filter resolved to a storage column and typed value.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Condition {
    pub(crate) column: &'static str,
    pub(crate) op: FilterOp,
    pub(crate) value: FieldValue,
}

impl Condition {
    fn resolve<R: Record>(filter: &Filter) -> ResultEngine<Self> {
        let spec = field_spec::<R>(&filter.field)?;
        let value = match filter.op {
            FilterOp::ILike => {
                if spec.kind != FieldKind::Text {
                    return Err(EngineError::InvalidQuery(format!(
                        "ilike is only supported on text fields, not '{}'",
                        filter.field
                    )));
                }
                FieldValue::Text(ilike_pattern(&filter.value))
            }
            _ => spec.kind.parse(&filter.value)?,
        };
        Ok(Self {
            column: spec.column,
            op: filter.op,
            value,
        })
    }

    /// Evaluate the condition against a record, for in-memory stores.
    pub(crate) fn matches<R: Record>(&self, record: &R) -> bool {
        let Some(actual) = record.value(self.column) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => actual.compare(&self.value) == Some(Ordering::Equal),
            FilterOp::Gte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lte => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::ILike => match (&actual, &self.value) {
                // ASCII-only folding, as SQLite's lower() does.
                (FieldValue::Text(text), FieldValue::Text(pattern)) => {
                    like_matches(&pattern.to_ascii_lowercase(), &text.to_ascii_lowercase())
                }
                _ => false,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResolvedQuery {
    pub(crate) conditions: Vec<Condition>,
    pub(crate) sort: (&'static str, SortDirection),
    pub(crate) pagination: Option<Pagination>,
}

/// A pattern without `%` is a substring match.
pub(crate) fn ilike_pattern(raw: &str) -> String {
    if raw.contains('%') {
        raw.to_string()
    } else {
        format!("%{raw}%")
    }
}

/// SQL `LIKE` semantics: `%` matches any run, `_` matches one character.
pub(crate) fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // matched[j] = pattern[..i] matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut any = false;
                for j in 0..=text.len() {
                    any |= matched[j];
                    next[j] = any;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && (*p == '_' || *p == text[j - 1]);
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}

/// A record type that can be stored in a repository.
pub trait Record: Clone + Send + Sync + 'static {
    /// Table / collection name.
    const COLLECTION: &'static str;
    /// API field and direction used when the caller does not sort.
    const DEFAULT_SORT: (&'static str, SortDirection);

    fn id(&self) -> Uuid;

    /// Resolve an API field name.
    fn field(name: &str) -> Option<FieldSpec>;

    /// Value stored in `column`, `None` when null.
    fn value(&self, column: &str) -> Option<FieldValue>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Item {
        id: Uuid,
        name: String,
        amount: i64,
        date: NaiveDate,
    }

    impl Record for Item {
        const COLLECTION: &'static str = "items";
        const DEFAULT_SORT: (&'static str, SortDirection) = ("date", SortDirection::Desc);

        fn id(&self) -> Uuid {
            self.id
        }

        fn field(name: &str) -> Option<FieldSpec> {
            match name {
                "id" => Some(FieldSpec::new("id", FieldKind::Id)),
                "name" => Some(FieldSpec::new("name", FieldKind::Text)),
                "amount" => Some(FieldSpec::new("amount_minor", FieldKind::Money)),
                "date" => Some(FieldSpec::new("date", FieldKind::Date)),
                _ => None,
            }
        }

        fn value(&self, column: &str) -> Option<FieldValue> {
            match column {
                "id" => Some(FieldValue::Text(self.id.to_string())),
                "name" => Some(FieldValue::Text(self.name.clone())),
                "amount_minor" => Some(FieldValue::Integer(self.amount)),
                "date" => Some(FieldValue::Date(self.date)),
                _ => None,
            }
        }
    }

    fn item(name: &str, amount: i64, date: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: name.to_string(),
            amount,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn params_split_prefixes_and_reserved_keys() {
        let query = ListQuery::from_params([
            ("gte_date", "2024-01-01"),
            ("lte_date", "2024-01-31"),
            ("ilike_name", "groc"),
            ("type", "expense"),
            ("sort", "amount"),
            ("order", "desc"),
            ("page", "2"),
            ("limit", "10"),
            ("category_id", ""),
        ])
        .unwrap();

        assert_eq!(
            query.filters,
            vec![
                Filter::gte("date", "2024-01-01"),
                Filter::lte("date", "2024-01-31"),
                Filter::ilike("name", "groc"),
                Filter::eq("type", "expense"),
            ]
        );
        assert_eq!(
            query.sort,
            Some(Sort {
                field: "amount".to_string(),
                direction: SortDirection::Desc
            })
        );
        assert_eq!(query.pagination, Some(Pagination { page: 2, limit: 10 }));
    }

    #[test]
    fn params_reject_bad_pagination_and_order() {
        assert!(ListQuery::from_params([("page", "0")]).is_err());
        assert!(ListQuery::from_params([("limit", "abc")]).is_err());
        assert!(ListQuery::from_params([("limit", "101")]).is_err());
        assert!(ListQuery::from_params([("order", "sideways")]).is_err());
    }

    #[test]
    fn pagination_without_limit_uses_default() {
        let query = ListQuery::from_params([("page", "3")]).unwrap();
        let pagination = query.pagination.unwrap();
        assert_eq!(pagination.limit, DEFAULT_LIMIT);
        assert_eq!(pagination.offset(), 40);
        assert_eq!(pagination.total_pages(41), 3);
    }

    #[test]
    fn resolve_maps_fields_to_columns_and_typed_values() {
        let query = ListQuery::new()
            .filter(Filter::gte("amount", "10.50"))
            .sort("amount", SortDirection::Desc);
        let resolved = query.resolve::<Item>().unwrap();
        assert_eq!(resolved.conditions[0].column, "amount_minor");
        assert_eq!(resolved.conditions[0].value, FieldValue::Integer(1050));
        assert_eq!(resolved.sort, ("amount_minor", SortDirection::Desc));
    }

    #[test]
    fn resolve_uses_default_sort() {
        let resolved = ListQuery::new().resolve::<Item>().unwrap();
        assert_eq!(resolved.sort, ("date", SortDirection::Desc));
    }

    #[test]
    fn resolve_rejects_unknown_fields_and_bad_values() {
        assert!(ListQuery::new().filter(Filter::eq("nope", "x")).resolve::<Item>().is_err());
        assert!(
            ListQuery::new()
                .filter(Filter::gte("date", "January"))
                .resolve::<Item>()
                .is_err()
        );
        assert!(
            ListQuery::new()
                .filter(Filter::ilike("amount", "1"))
                .resolve::<Item>()
                .is_err()
        );
        assert!(ListQuery::new().sort("nope", SortDirection::Asc).resolve::<Item>().is_err());
    }

    #[test]
    fn conditions_match_records_in_memory() {
        let groceries = item("Weekly Groceries", 4500, "2024-01-15");
        let resolved = ListQuery::new()
            .filter(Filter::gte("date", "2024-01-01"))
            .filter(Filter::lte("date", "2024-01-31"))
            .filter(Filter::ilike("name", "GROC"))
            .resolve::<Item>()
            .unwrap();
        assert!(resolved.conditions.iter().all(|c| c.matches(&groceries)));

        let february = item("Groceries", 4500, "2024-02-01");
        assert!(!resolved.conditions.iter().all(|c| c.matches(&february)));
    }

    #[test]
    fn like_supports_wildcards() {
        assert!(like_matches("%groc%", "weekly groceries"));
        assert!(like_matches("gro_eries", "groceries"));
        assert!(like_matches("%", ""));
        assert!(!like_matches("groc", "groceries"));
        assert!(!like_matches("_", ""));
        assert_eq!(ilike_pattern("rent"), "%rent%");
        assert_eq!(ilike_pattern("rent%"), "rent%");
    }
}
