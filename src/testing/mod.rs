//! Test support: an in-memory [`RecordSource`] that evaluates [`Filter`]
//! plans the way Postgres would, so query-builder properties can be checked
//! without a database.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::database::DatabaseError;
use crate::filter::{Condition, FieldKind, Filter, FilterOp, RecordSource, SortDirection};

pub struct MemorySource {
    records: Vec<Value>,
}

impl MemorySource {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    fn matching(&self, filter: &Filter) -> Result<Vec<&Value>, DatabaseError> {
        let mut out = Vec::new();
        for record in &self.records {
            let mut keep = true;
            for condition in filter.constraints() {
                if !satisfies(record, condition)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(record);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch_page(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError> {
        let mut rows = self.matching(filter)?;
        let config = filter.config();
        let kind_of = |name: &str| config.field(name).map(|f| f.kind).unwrap_or(FieldKind::Text);

        let mut keys: Vec<(&str, SortDirection)> =
            filter.sort_keys().iter().map(|k| (k.field, k.direction)).collect();
        if !keys.iter().any(|(f, _)| *f == "id") {
            keys.push(("id", SortDirection::Asc));
        }

        rows.sort_by(|a, b| {
            for (field, direction) in &keys {
                let kind = kind_of(field);
                let ord = compare_nullable(scalar_of(kind, &a[*field]), scalar_of(kind, &b[*field]), *direction);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let page = filter.page();
        let projected = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|record| {
                let mut row = Map::new();
                for name in filter.projection() {
                    row.insert(name.to_string(), record.get(*name).cloned().unwrap_or(Value::Null));
                }
                Value::Object(row)
            })
            .collect();
        Ok(projected)
    }

    async fn count_matches(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        Ok(self.matching(filter)?.len() as i64)
    }
}

#[derive(Debug, PartialEq, PartialOrd)]
enum Scalar {
    Num(f64),
    Bool(bool),
    Time(DateTime<FixedOffset>),
    Text(String),
}

/// Casts a bound parameter the way `$n::type` would.
fn cast(kind: FieldKind, raw: &str) -> Result<Scalar, DatabaseError> {
    let invalid = || DatabaseError::QueryError(format!("invalid input syntax for type {}: \"{}\"", kind.pg_type(), raw));
    let raw = raw.trim();
    Ok(match kind {
        FieldKind::Integer => Scalar::Num(raw.parse::<i64>().map_err(|_| invalid())? as f64),
        FieldKind::Float => Scalar::Num(raw.parse::<f64>().map_err(|_| invalid())?),
        FieldKind::Boolean => Scalar::Bool(raw.parse::<bool>().map_err(|_| invalid())?),
        FieldKind::Timestamp => Scalar::Time(DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?),
        FieldKind::Uuid => Scalar::Text(uuid::Uuid::parse_str(raw).map_err(|_| invalid())?.to_string()),
        FieldKind::Json => Scalar::Text(serde_json::from_str::<Value>(raw).map_err(|_| invalid())?.to_string()),
        FieldKind::Text | FieldKind::TextArray => Scalar::Text(raw.to_string()),
    })
}

fn scalar_of(kind: FieldKind, value: &Value) -> Option<Scalar> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::Number(n) => n.as_f64().map(Scalar::Num),
        Value::String(s) => cast(kind, s).ok().or_else(|| Some(Scalar::Text(s.clone()))),
        other => Some(Scalar::Text(other.to_string())),
    }
}

/// Nulls sort last ascending and first descending, as in Postgres.
fn compare_nullable(a: Option<Scalar>, b: Option<Scalar>, direction: SortDirection) -> Ordering {
    let ord = match (&a, &b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
    };
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn elements(value: &Value) -> impl Iterator<Item = &str> {
    value.as_array().into_iter().flatten().filter_map(Value::as_str)
}

fn satisfies(record: &Value, condition: &Condition) -> Result<bool, DatabaseError> {
    Ok(match condition {
        Condition::Compare { field, kind: FieldKind::TextArray, op, value } => {
            *op == FilterOp::Eq && elements(&record[*field]).any(|e| e == value)
        }
        Condition::In { field, kind: FieldKind::TextArray, values } => {
            elements(&record[*field]).any(|e| values.iter().any(|v| v == e))
        }
        Condition::Compare { field, kind, op, value } => {
            let wanted = cast(*kind, value)?;
            match scalar_of(*kind, &record[*field]) {
                None => false,
                Some(actual) => {
                    let ord = actual.partial_cmp(&wanted);
                    match op {
                        FilterOp::Eq | FilterOp::In => ord == Some(Ordering::Equal),
                        FilterOp::Gt => ord == Some(Ordering::Greater),
                        FilterOp::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
                        FilterOp::Lt => ord == Some(Ordering::Less),
                        FilterOp::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
                    }
                }
            }
        }
        Condition::In { field, kind, values } => {
            let wanted = values.iter().map(|v| cast(*kind, v)).collect::<Result<Vec<_>, _>>()?;
            match scalar_of(*kind, &record[*field]) {
                None => false,
                Some(actual) => wanted.contains(&actual),
            }
        }
        Condition::Search { fields, term } => {
            let needle = term.to_lowercase();
            fields.iter().any(|f| {
                record[*f]
                    .as_str()
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
        Condition::Never { .. } => false,
    })
}
