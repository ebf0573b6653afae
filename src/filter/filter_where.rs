use super::types::{Condition, FieldKind, FilterOp};

/// Renders a conjunction of [`Condition`]s into a parameterised WHERE body.
///
/// Every value is bound as text and cast in SQL to the field's storage type,
/// so a value that does not parse as that type fails inside the database
/// rather than here. Array fields match on membership: equality means the
/// array contains the value and `in` means it shares at least one element.
pub struct FilterWhere {
    param_values: Vec<String>,
}

impl FilterWhere {
    fn new() -> Self {
        Self { param_values: vec![] }
    }

    /// Returns the WHERE body (empty when there are no conditions) and its
    /// positional parameters.
    pub fn generate(conditions: &[Condition]) -> (String, Vec<String>) {
        let mut filter_where = Self::new();
        let parts: Vec<String> = conditions
            .iter()
            .map(|c| filter_where.build_sql_condition(c))
            .collect();
        (parts.join(" AND "), filter_where.param_values)
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Compare { field, kind: FieldKind::TextArray, op, value } => match op {
                FilterOp::Eq => {
                    let placeholder = self.param(value.clone());
                    format!("{}::text = ANY(\"{}\")", placeholder, field)
                }
                // Arrays have no ordering against a single element.
                _ => "1=0".to_string(),
            },
            Condition::Compare { field, kind, op, value } => {
                let placeholder = self.param(value.clone());
                format!("\"{}\" {} {}::{}", field, op.to_sql(), placeholder, kind.pg_type())
            }
            Condition::In { values, .. } if values.is_empty() => "1=0".to_string(),
            Condition::In { field, kind: FieldKind::TextArray, values } => {
                let placeholders: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                format!("\"{}\" && ARRAY[{}]::text[]", field, placeholders.join(", "))
            }
            Condition::In { field, kind, values } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| format!("{}::{}", self.param(v.clone()), kind.pg_type()))
                    .collect();
                format!("\"{}\" {} ({})", field, FilterOp::In.to_sql(), placeholders.join(", "))
            }
            Condition::Search { fields, .. } if fields.is_empty() => "1=0".to_string(),
            Condition::Search { fields, term } => {
                let placeholder = self.param(format!("%{}%", escape_like(term)));
                let alternatives: Vec<String> = fields
                    .iter()
                    .map(|f| format!("\"{}\" ILIKE {}", f, placeholder))
                    .collect();
                format!("({})", alternatives.join(" OR "))
            }
            Condition::Never { .. } => "1=0".to_string(),
        }
    }

    fn param(&mut self, value: String) -> String {
        self.param_values.push(value);
        format!("${}", self.param_values.len())
    }
}

/// Escapes LIKE metacharacters so the search term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conditions_render_nothing() {
        let (sql, params) = FilterWhere::generate(&[]);
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn comparisons_are_cast_and_numbered() {
        let conditions = vec![
            Condition::Compare { field: "price", kind: FieldKind::Float, op: FilterOp::Gte, value: "1000".into() },
            Condition::Compare { field: "price", kind: FieldKind::Float, op: FilterOp::Lte, value: "5000".into() },
            Condition::Compare { field: "make", kind: FieldKind::Text, op: FilterOp::Eq, value: "Volvo".into() },
        ];
        let (sql, params) = FilterWhere::generate(&conditions);
        assert_eq!(
            sql,
            "\"price\" >= $1::double precision AND \"price\" <= $2::double precision AND \"make\" = $3::text"
        );
        assert_eq!(params, vec!["1000", "5000", "Volvo"]);
    }

    #[test]
    fn membership_expands_placeholders() {
        let conditions = vec![Condition::In {
            field: "year",
            kind: FieldKind::Integer,
            values: vec!["2019".into(), "2020".into()],
        }];
        let (sql, params) = FilterWhere::generate(&conditions);
        assert_eq!(sql, "\"year\" IN ($1::bigint, $2::bigint)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn array_fields_match_on_membership() {
        let conditions = vec![
            Condition::Compare { field: "features", kind: FieldKind::TextArray, op: FilterOp::Eq, value: "Ramps".into() },
            Condition::In { field: "images", kind: FieldKind::TextArray, values: vec!["a.jpg".into(), "b.jpg".into()] },
        ];
        let (sql, params) = FilterWhere::generate(&conditions);
        assert_eq!(sql, "$1::text = ANY(\"features\") AND \"images\" && ARRAY[$2, $3]::text[]");
        assert_eq!(params, vec!["Ramps", "a.jpg", "b.jpg"]);
    }

    #[test]
    fn empty_membership_and_unknown_fields_match_nothing() {
        let conditions = vec![
            Condition::In { field: "year", kind: FieldKind::Integer, values: vec![] },
            Condition::Never { field: "colour".into() },
        ];
        let (sql, params) = FilterWhere::generate(&conditions);
        assert_eq!(sql, "1=0 AND 1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn search_shares_one_escaped_parameter() {
        const FIELDS: &[&str] = &["make", "model"];
        let conditions = vec![Condition::Search { fields: FIELDS, term: "50%_off".into() }];
        let (sql, params) = FilterWhere::generate(&conditions);
        assert_eq!(sql, "(\"make\" ILIKE $1 OR \"model\" ILIKE $1)");
        assert_eq!(params, vec!["%50\\%\\_off%"]);
    }
}
