use std::collections::BTreeMap;

/// Keys that drive pagination, sorting, projection and search. They never
/// become filter constraints.
pub const RESERVED_KEYS: &[&str] = &["page", "limit", "sort", "fields", "search", "q"];

/// Every occurrence of one key in the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamEntry {
    /// Plain `key=value` occurrences, in order.
    pub values: Vec<String>,
    /// `key[op]=value` occurrences keyed by the raw operator text.
    pub operators: BTreeMap<String, Vec<String>>,
}

/// Untyped request parameters as they arrive in a URL query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: BTreeMap<String, ParamEntry>,
}

impl QueryParams {
    /// Parses a raw (still percent-encoded) query string. `None` and `""`
    /// both give an empty parameter set.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or_default();
        Self::from_pairs(url::form_urlencoded::parse(raw.as_bytes()))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            params.push(key.as_ref(), value.into());
        }
        params
    }

    pub fn push(&mut self, key: &str, value: String) {
        match split_operator(key) {
            Some((base, op)) => self
                .entries
                .entry(base.to_string())
                .or_default()
                .operators
                .entry(op.to_string())
                .or_default()
                .push(value),
            None => self.entries.entry(key.to_string()).or_default().values.push(value),
        }
    }

    /// First plain value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|e| e.values.first())
            .map(String::as_str)
    }

    /// `search`, falling back to `q`; blank terms count as absent.
    pub fn search_term(&self) -> Option<&str> {
        let nonblank = |key| self.get(key).map(str::trim).filter(|term| !term.is_empty());
        nonblank("search").or_else(|| nonblank("q"))
    }

    /// Non-reserved entries, i.e. the filter constraints.
    pub fn filters(&self) -> impl Iterator<Item = (&str, &ParamEntry)> {
        self.entries
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `price[gte]` -> `("price", "gte")`. Keys without a well-formed bracket
/// suffix are plain keys.
fn split_operator(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    if open == 0 || !key.ends_with(']') {
        return None;
    }
    Some((&key[..open], &key[open + 1..key.len() - 1]))
}

/// Splits a comma-separated parameter (`sort`, `fields`) into trimmed,
/// non-empty items.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator_suffixes() {
        let params = QueryParams::parse(Some("price%5Bgte%5D=1000&price[lte]=5000&make=Volvo"));
        let (_, price) = params.filters().find(|(k, _)| *k == "price").unwrap();
        assert_eq!(price.operators["gte"], vec!["1000"]);
        assert_eq!(price.operators["lte"], vec!["5000"]);
        assert!(price.values.is_empty());
        assert_eq!(params.get("make"), Some("Volvo"));
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let params = QueryParams::parse(Some("page=2&limit=5&sort=-price&fields=make&search=kw&q=x&year=2020"));
        let keys: Vec<&str> = params.filters().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["year"]);
        assert_eq!(params.get("page"), Some("2"));
    }

    #[test]
    fn repeated_keys_collect_values() {
        let params = QueryParams::parse(Some("make=Volvo&make=Mack"));
        let (_, make) = params.filters().next().unwrap();
        assert_eq!(make.values, vec!["Volvo", "Mack"]);
    }

    #[test]
    fn search_falls_back_to_q_and_ignores_blank() {
        assert_eq!(QueryParams::parse(Some("q=reefer")).search_term(), Some("reefer"));
        assert_eq!(QueryParams::parse(Some("search=+&q=x")).search_term(), Some("x"));
        assert_eq!(QueryParams::parse(Some("search=&q=reefer")).search_term(), Some("reefer"));
        assert_eq!(QueryParams::parse(Some("search=+&q=")).search_term(), None);
        assert_eq!(QueryParams::parse(None).search_term(), None);
    }

    #[test]
    fn malformed_brackets_are_plain_keys() {
        let params = QueryParams::parse(Some("[gte]=1&price[gte=2"));
        assert_eq!(params.get("[gte]"), Some("1"));
        assert_eq!(params.get("price[gte"), Some("2"));
    }

    #[test]
    fn empty_query_is_empty() {
        assert!(QueryParams::parse(Some("")).is_empty());
        assert!(QueryParams::parse(None).is_empty());
    }
}
