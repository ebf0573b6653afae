use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{check_one_of, Model, ValidationErrors};
use crate::filter::{field, FieldKind, FieldSpec, QueryConfig};

pub const CONDITIONS: &[&str] = &["New", "Excellent", "Good", "Fair", "Poor"];
pub const TRAILER_STATUSES: &[&str] = &["Available", "Pending", "Sold", "Reserved"];

pub const VIN_LEN: usize = 17;
pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MIN_YEAR: i32 = 1900;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Trailer {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub length: f64,
    pub axles: i32,
    pub vin_number: String,
    pub price: f64,
    pub description: String,
    pub features: Vec<String>,
    pub condition: String,
    pub status: String,
    pub location: String,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub gvwr: Option<f64>,
    pub capacity: Option<f64>,
    pub hitch: Option<String>,
    pub suspension: Option<String>,
    pub brakes: Option<String>,
    pub floor_type: Option<String>,
    pub color: Option<String>,
    pub ramps: bool,
    pub owner: Option<Uuid>,
    pub created_by: Uuid,
    pub revenue: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Trailer {
    const TABLE: &'static str = "trailers";
    const LABEL: &'static str = "Trailer";
}

/// `features` may arrive as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Body of `POST /api/trailers`. Missing listing fields get placeholder
/// values so a trailer can be drafted and completed later.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTrailer {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub length: Option<f64>,
    pub axles: Option<i32>,
    pub vin_number: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<OneOrMany>,
    pub condition: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub gvwr: Option<f64>,
    pub capacity: Option<f64>,
    pub hitch: Option<String>,
    pub suspension: Option<String>,
    pub brakes: Option<String>,
    pub floor_type: Option<String>,
    pub color: Option<String>,
    pub ramps: Option<bool>,
    pub owner: Option<Uuid>,
}

/// A validated trailer ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailerDraft {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub kind: String,
    pub length: f64,
    pub axles: i32,
    pub vin_number: String,
    pub price: f64,
    pub description: String,
    pub features: Vec<String>,
    pub condition: String,
    pub status: String,
    pub location: String,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub gvwr: Option<f64>,
    pub capacity: Option<f64>,
    pub hitch: Option<String>,
    pub suspension: Option<String>,
    pub brakes: Option<String>,
    pub floor_type: Option<String>,
    pub color: Option<String>,
    pub ramps: bool,
    pub owner: Uuid,
    pub created_by: Uuid,
}

impl NewTrailer {
    /// Fills defaults and validates. `owner` is the listing's owner and creator.
    pub fn into_draft(self, owner: Uuid, now: DateTime<Utc>) -> Result<TrailerDraft, ValidationErrors> {
        let text_or = |value: Option<String>, default: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let draft = TrailerDraft {
            make: text_or(self.make, "Unknown Make"),
            model: text_or(self.model, "Unknown Model"),
            year: self.year.unwrap_or_else(|| now.year()),
            kind: text_or(self.kind, "General"),
            length: self.length.unwrap_or(20.0),
            axles: self.axles.unwrap_or(2),
            vin_number: self
                .vin_number
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| placeholder_vin(now)),
            price: self.price.unwrap_or(0.0),
            description: text_or(self.description, "No description provided"),
            features: self.features.map(Vec::from).unwrap_or_default(),
            condition: text_or(self.condition, "Good"),
            status: text_or(self.status, "Available"),
            location: text_or(self.location, "Not specified"),
            image_url: self.image_url,
            images: self.images,
            gvwr: self.gvwr,
            capacity: self.capacity,
            hitch: self.hitch,
            suspension: self.suspension,
            brakes: self.brakes,
            floor_type: self.floor_type,
            color: self.color,
            ramps: self.ramps.unwrap_or(false),
            owner,
            created_by: owner,
        };

        let mut errors = ValidationErrors::new();
        validate_ranges(
            &mut errors,
            now,
            Some(draft.year),
            Some(draft.length),
            Some(draft.axles),
            Some(&draft.vin_number),
            Some(draft.price),
            Some(&draft.description),
            draft.gvwr,
            draft.capacity,
        );
        check_one_of(&mut errors, "condition", Some(&draft.condition), CONDITIONS);
        check_one_of(&mut errors, "status", Some(&draft.status), TRAILER_STATUSES);
        errors.into_result().map(|_| draft)
    }
}

/// Body of `PATCH /api/trailers/:id`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailerChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub length: Option<f64>,
    pub axles: Option<i32>,
    pub vin_number: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub features: Option<OneOrMany>,
    pub condition: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub gvwr: Option<f64>,
    pub capacity: Option<f64>,
    pub hitch: Option<String>,
    pub suspension: Option<String>,
    pub brakes: Option<String>,
    pub floor_type: Option<String>,
    pub color: Option<String>,
    pub ramps: Option<bool>,
    pub revenue: Option<f64>,
}

impl TrailerChanges {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (name, value) in [
            ("make", &self.make),
            ("model", &self.model),
            ("type", &self.kind),
            ("location", &self.location),
        ] {
            if let Some(v) = value {
                errors.check(!v.trim().is_empty(), name, "Value cannot be empty");
            }
        }
        validate_ranges(
            &mut errors,
            now,
            self.year,
            self.length,
            self.axles,
            self.vin_number.as_deref(),
            self.price,
            self.description.as_deref(),
            self.gvwr,
            self.capacity,
        );
        check_one_of(&mut errors, "condition", self.condition.as_deref(), CONDITIONS);
        check_one_of(&mut errors, "status", self.status.as_deref(), TRAILER_STATUSES);
        errors.into_result()
    }
}

#[allow(clippy::too_many_arguments)]
fn validate_ranges(
    errors: &mut ValidationErrors,
    now: DateTime<Utc>,
    year: Option<i32>,
    length: Option<f64>,
    axles: Option<i32>,
    vin_number: Option<&str>,
    price: Option<f64>,
    description: Option<&str>,
    gvwr: Option<f64>,
    capacity: Option<f64>,
) {
    if let Some(year) = year {
        errors.check(year >= MIN_YEAR, "year", "Year must be at least 1900");
        errors.check(year <= now.year() + 1, "year", "Year cannot be in the future");
    }
    if let Some(length) = length {
        errors.check(length >= 0.0, "length", "Length must be positive");
    }
    if let Some(axles) = axles {
        errors.check(axles >= 1, "axles", "Must have at least 1 axle");
    }
    if let Some(vin) = vin_number {
        errors.check(vin.trim().chars().count() == VIN_LEN, "vin_number", "VIN number should be 17 characters");
    }
    if let Some(price) = price {
        errors.check(price >= 0.0, "price", "Price must be positive");
    }
    if let Some(description) = description {
        errors.check(
            description.trim().chars().count() >= MIN_DESCRIPTION_LEN,
            "description",
            "Description must be at least 10 characters long",
        );
    }
    if let Some(gvwr) = gvwr {
        errors.check(gvwr >= 0.0, "gvwr", "GVWR must be positive");
    }
    if let Some(capacity) = capacity {
        errors.check(capacity >= 0.0, "capacity", "Capacity must be positive");
    }
}

/// `DEV` + the last 10 digits of the millisecond clock + 7 random digits.
pub fn placeholder_vin(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().unsigned_abs() % 10_000_000_000;
    let random = Uuid::new_v4().as_u128() % 10_000_000;
    format!("DEV{:010}{:07}", millis, random)[..VIN_LEN].to_string()
}

/// Status totals for `GET /api/trailers/stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct TrailerStats {
    pub total_trailers: i64,
    pub available_trailers: i64,
    pub reserved_trailers: i64,
    pub sold_trailers: i64,
    pub pending_trailers: i64,
}

const FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Uuid),
    field("make", FieldKind::Text),
    field("model", FieldKind::Text),
    field("year", FieldKind::Integer),
    field("type", FieldKind::Text),
    field("length", FieldKind::Float),
    field("axles", FieldKind::Integer),
    field("vin_number", FieldKind::Text),
    field("price", FieldKind::Float),
    field("description", FieldKind::Text),
    field("features", FieldKind::TextArray),
    field("condition", FieldKind::Text),
    field("status", FieldKind::Text),
    field("location", FieldKind::Text),
    field("image_url", FieldKind::Text),
    field("images", FieldKind::TextArray),
    field("gvwr", FieldKind::Float),
    field("capacity", FieldKind::Float),
    field("hitch", FieldKind::Text),
    field("suspension", FieldKind::Text),
    field("brakes", FieldKind::Text),
    field("floor_type", FieldKind::Text),
    field("color", FieldKind::Text),
    field("ramps", FieldKind::Boolean),
    field("owner", FieldKind::Uuid),
    field("created_by", FieldKind::Uuid),
    field("revenue", FieldKind::Float),
    field("created_at", FieldKind::Timestamp),
    field("updated_at", FieldKind::Timestamp),
];

pub const TRAILER_QUERY: QueryConfig = QueryConfig {
    table: Trailer::TABLE,
    fields: FIELDS,
    default_limit: 100,
    max_limit: None,
    default_sort: "-created_at",
    searchable_fields: &["make", "model", "type", "description"],
    default_fields: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_body_gets_placeholders() {
        let owner = Uuid::new_v4();
        let draft = NewTrailer::default().into_draft(owner, now()).unwrap();
        assert_eq!(draft.make, "Unknown Make");
        assert_eq!(draft.model, "Unknown Model");
        assert_eq!(draft.year, 2025);
        assert_eq!(draft.kind, "General");
        assert_eq!(draft.description, "No description provided");
        assert_eq!(draft.location, "Not specified");
        assert_eq!(draft.condition, "Good");
        assert_eq!(draft.status, "Available");
        assert_eq!((draft.price, draft.length, draft.axles), (0.0, 20.0, 2));
        assert_eq!((draft.owner, draft.created_by), (owner, owner));
        assert!(draft.vin_number.starts_with("DEV"));
        assert_eq!(draft.vin_number.len(), VIN_LEN);
    }

    #[test]
    fn features_accept_string_or_list() {
        let one: NewTrailer = serde_json::from_str(r#"{"features":"Spare tire"}"#).unwrap();
        let many: NewTrailer = serde_json::from_str(r#"{"features":["Ramps","LED lights"]}"#).unwrap();
        let owner = Uuid::new_v4();
        assert_eq!(one.into_draft(owner, now()).unwrap().features, vec!["Spare tire"]);
        assert_eq!(many.into_draft(owner, now()).unwrap().features.len(), 2);
    }

    #[test]
    fn range_checks() {
        let trailer = NewTrailer {
            year: Some(2027),
            axles: Some(0),
            vin_number: Some("SHORT".into()),
            description: Some("tiny".into()),
            condition: Some("Mint".into()),
            price: Some(-1.0),
            ..Default::default()
        };
        let errors = trailer.into_draft(Uuid::new_v4(), now()).unwrap_err();
        for key in ["year", "axles", "vin_number", "description", "condition", "price"] {
            assert!(errors.fields().contains_key(key), "missing error for {}", key);
        }
    }

    #[test]
    fn next_year_models_are_allowed() {
        let trailer = NewTrailer { year: Some(2026), ..Default::default() };
        assert!(trailer.into_draft(Uuid::new_v4(), now()).is_ok());
    }

    #[test]
    fn changes_only_check_present_fields() {
        assert!(TrailerChanges::default().validate(now()).is_ok());
        let changes = TrailerChanges { status: Some("Gone".into()), ..Default::default() };
        assert!(changes.validate(now()).unwrap_err().fields().contains_key("status"));
    }

    #[test]
    fn placeholder_vin_shape() {
        let vin = placeholder_vin(now());
        assert_eq!(vin.len(), VIN_LEN);
        assert!(vin[3..].chars().all(|c| c.is_ascii_digit()));
    }
}
