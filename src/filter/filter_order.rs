use super::types::{QueryConfig, SortDirection, SortKey};

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `-price,make` (or `price desc, make asc`) into sort keys.
    /// Fields the collection does not expose are skipped, as are repeats.
    pub fn parse(spec: &str, config: &QueryConfig) -> Vec<SortKey> {
        let mut out: Vec<SortKey> = Vec::new();
        for part in spec.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }

            let mut it = trimmed.split_whitespace();
            let Some(token) = it.next() else { continue };
            let (name, mut direction) = match token.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Desc),
                None => (token.strip_prefix('+').unwrap_or(token), SortDirection::Asc),
            };
            if let Some(dir) = it.next() {
                if dir.eq_ignore_ascii_case("desc") { direction = SortDirection::Desc; }
                else if dir.eq_ignore_ascii_case("asc") { direction = SortDirection::Asc; }
            }

            match config.field(name) {
                Some(f) if !out.iter().any(|k| k.field == f.name) => {
                    out.push(SortKey { field: f.name, direction });
                }
                Some(_) => {}
                None => tracing::debug!("Ignoring sort on unknown field '{}' for {}", name, config.table),
            }
        }
        out
    }

    /// Renders the ORDER BY clause, appending an `id` tiebreaker unless the
    /// keys already sort on it.
    pub fn generate(keys: &[SortKey]) -> String {
        let mut parts: Vec<String> = keys
            .iter()
            .map(|k| format!("\"{}\" {}", k.field, k.direction.to_sql()))
            .collect();
        if !keys.iter().any(|k| k.field == "id") {
            parts.push("\"id\" ASC".to_string());
        }
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::{field, FieldKind, FieldSpec};

    const FIELDS: &[FieldSpec] = &[
        field("id", FieldKind::Uuid),
        field("make", FieldKind::Text),
        field("price", FieldKind::Float),
        field("created_at", FieldKind::Timestamp),
    ];

    const CONFIG: QueryConfig = QueryConfig {
        table: "trucks",
        fields: FIELDS,
        default_limit: 10,
        max_limit: None,
        default_sort: "-created_at",
        searchable_fields: &["make"],
        default_fields: None,
    };

    #[test]
    fn parses_prefix_and_word_directions() {
        let keys = FilterOrder::parse("-price, make", &CONFIG);
        assert_eq!(keys, vec![
            SortKey { field: "price", direction: SortDirection::Desc },
            SortKey { field: "make", direction: SortDirection::Asc },
        ]);

        let keys = FilterOrder::parse("price desc,+make", &CONFIG);
        assert_eq!(keys[0].direction, SortDirection::Desc);
        assert_eq!(keys[1].direction, SortDirection::Asc);
    }

    #[test]
    fn skips_unknown_and_repeated_fields() {
        let keys = FilterOrder::parse("password_hash,-make,make,,", &CONFIG);
        assert_eq!(keys, vec![SortKey { field: "make", direction: SortDirection::Desc }]);
    }

    #[test]
    fn generate_appends_id_tiebreaker() {
        let keys = FilterOrder::parse("-price", &CONFIG);
        assert_eq!(FilterOrder::generate(&keys), "ORDER BY \"price\" DESC, \"id\" ASC");
        assert_eq!(FilterOrder::generate(&[]), "ORDER BY \"id\" ASC");

        let keys = FilterOrder::parse("-id", &CONFIG);
        assert_eq!(FilterOrder::generate(&keys), "ORDER BY \"id\" DESC");
    }
}
