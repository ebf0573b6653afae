use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::params::{split_list, ParamEntry, QueryParams};
use super::types::{Condition, FieldKind, FilterOp, PageSpec, QueryConfig, SortKey, SqlResult};
use crate::database::DatabaseError;

/// A query against one collection, assembled from request parameters.
///
/// The handle starts out scoped (see [`Filter::scope`]) or unconstrained and
/// every `apply_*` step only adds to it. Nothing runs until
/// [`Filter::execute`]. The match count is built from the constraint list
/// alone, so sorting, projection and pagination never change it.
#[derive(Debug, Clone)]
pub struct Filter {
    config: QueryConfig,
    constraints: Vec<Condition>,
    sort: Vec<SortKey>,
    projection: Vec<&'static str>,
    page: PageSpec,
}

impl Filter {
    /// A handle with the collection defaults: newest first, page 1, default
    /// page size and default projection.
    pub fn new(config: QueryConfig) -> Self {
        let default_limit = match config.max_limit {
            Some(max) if max > 0 => config.default_limit.min(max),
            _ => config.default_limit,
        };
        Self {
            sort: FilterOrder::parse(config.default_sort, &config),
            projection: Self::default_projection(&config),
            page: PageSpec { page: 1, limit: default_limit.max(1) },
            constraints: vec![],
            config,
        }
    }

    /// Runs every step in order: filters, search, sort, fields, pagination.
    pub fn apply(&mut self, params: &QueryParams) -> &mut Self {
        self.apply_filters(params)
            .apply_search(params)
            .apply_sort(params)
            .apply_field_selection(params)
            .apply_pagination(params)
    }

    /// Pre-constrains the collection to `field = value`, e.g. one owner's
    /// listings.
    pub fn scope(&mut self, field: &str, value: impl Into<String>) -> &mut Self {
        let condition = match self.config.field(field) {
            Some(spec) => Condition::Compare {
                field: spec.name,
                kind: spec.kind,
                op: FilterOp::Eq,
                value: value.into(),
            },
            None => Condition::Never { field: field.to_string() },
        };
        self.constraints.push(condition);
        self
    }

    pub fn apply_filters(&mut self, params: &QueryParams) -> &mut Self {
        for (key, entry) in params.filters() {
            self.add_field_constraints(key, entry);
        }
        self
    }

    fn add_field_constraints(&mut self, key: &str, entry: &ParamEntry) {
        let Some(spec) = self.config.field(key) else {
            tracing::debug!("Filter on unknown field '{}' for {} matches nothing", key, self.config.table);
            self.constraints.push(Condition::Never { field: key.to_string() });
            return;
        };

        match entry.values.as_slice() {
            [] => {}
            [value] => self.constraints.push(Condition::Compare {
                field: spec.name,
                kind: spec.kind,
                op: FilterOp::Eq,
                value: value.clone(),
            }),
            values => self.constraints.push(Condition::In {
                field: spec.name,
                kind: spec.kind,
                values: values.to_vec(),
            }),
        }

        for (suffix, values) in &entry.operators {
            match FilterOp::from_suffix(suffix) {
                Some(FilterOp::In) => self.constraints.push(Condition::In {
                    field: spec.name,
                    kind: spec.kind,
                    values: values
                        .iter()
                        .flat_map(|v| split_list(v))
                        .map(str::to_string)
                        .collect(),
                }),
                Some(_) if spec.kind == FieldKind::TextArray => {
                    tracing::debug!("Ignoring ordering operator '{}' on array field {}", suffix, key)
                }
                Some(op) => {
                    for value in values {
                        self.constraints.push(Condition::Compare {
                            field: spec.name,
                            kind: spec.kind,
                            op,
                            value: value.clone(),
                        });
                    }
                }
                None => tracing::debug!("Ignoring unsupported operator '{}' on {}", suffix, key),
            }
        }
    }

    pub fn apply_search(&mut self, params: &QueryParams) -> &mut Self {
        if let Some(term) = params.search_term() {
            self.constraints.push(Condition::Search {
                fields: self.config.searchable_fields,
                term: term.to_string(),
            });
        }
        self
    }

    pub fn apply_sort(&mut self, params: &QueryParams) -> &mut Self {
        if let Some(spec) = params.get("sort") {
            let keys = FilterOrder::parse(spec, &self.config);
            if !keys.is_empty() {
                self.sort = keys;
            }
        }
        self
    }

    pub fn apply_field_selection(&mut self, params: &QueryParams) -> &mut Self {
        let Some(list) = params.get("fields") else { return self };

        let mut projection = vec!["id"];
        for name in split_list(list) {
            match self.config.field(name) {
                Some(spec) if !projection.contains(&spec.name) => projection.push(spec.name),
                Some(_) => {}
                None => tracing::debug!("Dropping unknown field '{}' from projection", name),
            }
        }
        self.projection = projection;
        self
    }

    pub fn apply_pagination(&mut self, params: &QueryParams) -> &mut Self {
        if let Some(page) = params.get("page").and_then(parse_positive) {
            self.page.page = page;
        }
        if let Some(limit) = params.get("limit").and_then(parse_positive) {
            self.page.limit = match self.config.max_limit {
                Some(max) if max > 0 && limit > max => {
                    tracing::debug!("Limit {} exceeds max {}, capping", limit, max);
                    max
                }
                _ => limit,
            };
        }
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn constraints(&self) -> &[Condition] {
        &self.constraints
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn projection(&self) -> &[&'static str] {
        &self.projection
    }

    pub fn page(&self) -> PageSpec {
        self.page
    }

    /// The page query. Each row comes back as one JSON object holding the
    /// projected fields.
    pub fn to_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.constraints);
        let select_clause = self
            .projection
            .iter()
            .map(|f| format!("'{}', \"{}\"", f, f))
            .collect::<Vec<_>>()
            .join(", ");

        let query = [
            format!("SELECT json_build_object({}) AS row", select_clause),
            format!("FROM \"{}\"", self.config.table),
            if where_clause.is_empty() { String::new() } else { format!("WHERE {}", where_clause) },
            FilterOrder::generate(&self.sort),
            format!("LIMIT {} OFFSET {}", self.page.limit, self.page.offset()),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        SqlResult { query, params }
    }

    /// The match-count query over the retained constraints only.
    pub fn to_count_sql(&self) -> SqlResult {
        let (where_clause, params) = FilterWhere::generate(&self.constraints);
        let query = if where_clause.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.config.table)
        } else {
            format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.config.table, where_clause)
        };
        SqlResult { query, params }
    }

    /// Fetches the page and the match count concurrently.
    pub async fn execute<S>(&self, source: &S) -> Result<FilterPage, DatabaseError>
    where
        S: RecordSource + ?Sized,
    {
        let (records, total) =
            futures::try_join!(source.fetch_page(self), source.count_matches(self))?;
        Ok(FilterPage {
            records,
            total: total.max(0) as u64,
            page: self.page,
        })
    }

    fn default_projection(config: &QueryConfig) -> Vec<&'static str> {
        let mut projection = vec!["id"];
        match config.default_fields {
            Some(names) => {
                for name in names {
                    if let Some(spec) = config.field(name) {
                        if !projection.contains(&spec.name) { projection.push(spec.name); }
                    }
                }
            }
            None => projection.extend(config.fields.iter().map(|f| f.name).filter(|n| *n != "id")),
        }
        projection
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// Anything that can run a [`Filter`]: the Postgres pool in production, an
/// in-memory collection in tests.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_page(&self, filter: &Filter) -> Result<Vec<Value>, DatabaseError>;
    async fn count_matches(&self, filter: &Filter) -> Result<i64, DatabaseError>;
}

/// One executed page plus the total number of matches.
#[derive(Debug, Clone)]
pub struct FilterPage {
    pub records: Vec<Value>,
    pub total: u64,
    pub page: PageSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl FilterPage {
    pub fn pagination(&self) -> Pagination {
        let PageSpec { page, limit } = self.page;
        let end = self.page.offset() + u64::from(limit);
        Pagination {
            next: (end < self.total).then(|| PageLink { page: page + 1, limit }),
            prev: (page > 1).then(|| PageLink { page: page - 1, limit }),
        }
    }
}
