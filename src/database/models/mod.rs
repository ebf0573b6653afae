pub mod subscription;
pub mod trailer;
pub mod truck;
pub mod user;

use std::collections::BTreeMap;

use sqlx::{postgres::PgRow, FromRow};

pub use subscription::Subscription;
pub use trailer::Trailer;
pub use truck::Truck;
pub use user::User;

/// A row type stored in its own table and addressed by `id`.
pub trait Model: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Human name used in "not found" messages.
    const LABEL: &'static str;
}

/// Per-field validation failures collected before a write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.0
    }
}

/// Checks `value` against an allow-list, recording `message` on mismatch.
pub fn check_one_of(errors: &mut ValidationErrors, field: &str, value: Option<&str>, allowed: &[&str]) {
    if let Some(v) = value {
        if !allowed.contains(&v) {
            errors.add(field, format!("{} must be one of: {}", field, allowed.join(", ")));
        }
    }
}
