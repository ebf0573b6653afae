use serde::Serialize;

/// Comparison operators a `field[op]=value` query key can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    /// Allow-listed operator suffixes. Anything else yields `None` and is dropped.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "gt" => Some(FilterOp::Gt),
            "gte" => Some(FilterOp::Gte),
            "lt" => Some(FilterOp::Lt),
            "lte" => Some(FilterOp::Lte),
            "in" => Some(FilterOp::In),
            _ => None,
        }
    }

    pub fn to_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "IN",
        }
    }
}

/// Storage type of a queryable field. Raw query-string values are cast to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Uuid,
    Json,
    TextArray,
}

impl FieldKind {
    pub fn pg_type(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "bigint",
            FieldKind::Float => "double precision",
            FieldKind::Boolean => "boolean",
            FieldKind::Timestamp => "timestamptz",
            FieldKind::Uuid => "uuid",
            FieldKind::Json => "jsonb",
            FieldKind::TextArray => "text[]",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

pub const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Per-collection query defaults handed to [`super::Filter::new`].
///
/// `fields` is the full set of public fields: the only names that can be
/// filtered, sorted or projected. Internal columns are left out of it.
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig {
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    pub default_limit: u32,
    pub max_limit: Option<u32>,
    /// Same syntax as the `sort` parameter, e.g. `-created_at`.
    pub default_sort: &'static str,
    pub searchable_fields: &'static [&'static str],
    /// Projection used when `fields` is absent. `None` means every public field.
    pub default_fields: Option<&'static [&'static str]>,
}

impl QueryConfig {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub const fn with_max_limit(mut self, max_limit: Option<u32>) -> Self {
        self.max_limit = max_limit;
        self
    }
}

/// One conjunct of the WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        field: &'static str,
        kind: FieldKind,
        op: FilterOp,
        value: String,
    },
    In {
        field: &'static str,
        kind: FieldKind,
        values: Vec<String>,
    },
    /// Case-insensitive substring match OR'ed across `fields`.
    Search {
        fields: &'static [&'static str],
        term: String,
    },
    /// Constraint on a field the collection does not have. Matches nothing.
    Never { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: u32,
    pub limit: u32,
}

impl PageSpec {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<String>,
}
