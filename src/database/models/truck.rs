use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{check_one_of, Model, ValidationErrors};
use crate::filter::{field, FieldKind, FieldSpec, QueryConfig};

pub const TRUCK_TYPES: &[&str] = &["box truck", "semi", "flatbed", "refrigerated", "tanker"];
pub const TRUCK_STATUSES: &[&str] = &["active", "maintenance", "retired"];
pub const FUEL_TYPES: &[&str] = &["diesel", "gasoline", "electric", "hybrid", "natural gas"];

/// Months between services when no due date is given.
pub const MAINTENANCE_INTERVAL_MONTHS: u32 = 6;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Truck {
    pub id: Uuid,
    pub owner: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: String,
    pub last_maintenance: DateTime<Utc>,
    pub next_maintenance_due: DateTime<Utc>,
    pub mileage: i64,
    pub fuel_type: String,
    pub capacity: Option<String>,
    pub notes: Option<String>,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub revenue: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for Truck {
    const TABLE: &'static str = "trucks";
    const LABEL: &'static str = "Truck";
}

/// Body of `POST /api/trucks`. The owner always comes from the token.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTruck {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance_due: Option<DateTime<Utc>>,
    pub mileage: Option<i64>,
    pub fuel_type: Option<String>,
    pub capacity: Option<String>,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A validated truck ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct TruckDraft {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub license_plate: String,
    pub kind: String,
    pub status: String,
    pub last_maintenance: DateTime<Utc>,
    pub next_maintenance_due: DateTime<Utc>,
    pub mileage: i64,
    pub fuel_type: String,
    pub capacity: Option<String>,
    pub notes: Option<String>,
    pub price: f64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub images: Vec<String>,
}

impl NewTruck {
    pub fn into_draft(self) -> Result<TruckDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let make = required_text(&mut errors, "make", self.make, "Please provide the truck make");
        let model = required_text(&mut errors, "model", self.model, "Please provide the truck model");
        let license_plate = required_text(
            &mut errors,
            "license_plate",
            self.license_plate,
            "Please provide the license plate number",
        );
        if self.year.is_none() {
            errors.add("year", "Please provide the truck year");
        }
        if self.last_maintenance.is_none() {
            errors.add("last_maintenance", "Please provide the last maintenance date");
        }
        match self.mileage {
            None => errors.add("mileage", "Please provide the current mileage"),
            Some(m) => errors.check(m >= 0, "mileage", "Mileage cannot be negative"),
        }
        if let Some(price) = self.price {
            errors.check(price >= 0.0, "price", "Price must be positive");
        }
        check_one_of(&mut errors, "type", self.kind.as_deref(), TRUCK_TYPES);
        check_one_of(&mut errors, "status", self.status.as_deref(), TRUCK_STATUSES);
        check_one_of(&mut errors, "fuel_type", self.fuel_type.as_deref(), FUEL_TYPES);

        let last_maintenance = self.last_maintenance.unwrap_or_default();
        let next_maintenance_due = match self.next_maintenance_due {
            Some(due) => due,
            None => match next_service(last_maintenance) {
                Some(due) => due,
                None => {
                    errors.add("last_maintenance", "Last maintenance date is out of range");
                    last_maintenance
                }
            },
        };

        errors.into_result()?;
        Ok(TruckDraft {
            make,
            model,
            year: self.year.unwrap_or_default(),
            license_plate,
            kind: self.kind.unwrap_or_else(|| TRUCK_TYPES[0].to_string()),
            status: self.status.unwrap_or_else(|| TRUCK_STATUSES[0].to_string()),
            last_maintenance,
            next_maintenance_due,
            mileage: self.mileage.unwrap_or_default(),
            fuel_type: self.fuel_type.unwrap_or_else(|| FUEL_TYPES[0].to_string()),
            capacity: self.capacity,
            notes: self.notes,
            price: self.price.unwrap_or(0.0),
            description: self.description,
            image_url: self.image_url,
            images: self.images,
        })
    }
}

/// Body of `PUT /api/trucks/:id`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TruckChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub license_plate: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub last_maintenance: Option<DateTime<Utc>>,
    pub next_maintenance_due: Option<DateTime<Utc>>,
    pub mileage: Option<i64>,
    pub fuel_type: Option<String>,
    pub capacity: Option<String>,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub revenue: Option<f64>,
}

impl TruckChanges {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (name, value) in [("make", &self.make), ("model", &self.model), ("license_plate", &self.license_plate)] {
            if let Some(v) = value {
                errors.check(!v.trim().is_empty(), name, "Value cannot be empty");
            }
        }
        if let Some(m) = self.mileage {
            errors.check(m >= 0, "mileage", "Mileage cannot be negative");
        }
        if let Some(price) = self.price {
            errors.check(price >= 0.0, "price", "Price must be positive");
        }
        check_one_of(&mut errors, "type", self.kind.as_deref(), TRUCK_TYPES);
        check_one_of(&mut errors, "status", self.status.as_deref(), TRUCK_STATUSES);
        check_one_of(&mut errors, "fuel_type", self.fuel_type.as_deref(), FUEL_TYPES);
        errors.into_result()
    }
}

/// Dashboard totals for `GET /api/trucks/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct TruckStats {
    pub total_trucks: i64,
    pub active_trucks: i64,
    pub maintenance_trucks: i64,
    pub retired_trucks: i64,
    pub revenue: f64,
}

pub fn next_service(last: DateTime<Utc>) -> Option<DateTime<Utc>> {
    last.checked_add_months(Months::new(MAINTENANCE_INTERVAL_MONTHS))
}

pub(crate) fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    message: &str,
) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => {
            errors.add(field, message);
            String::new()
        }
    }
}

const FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Uuid),
    field("owner", FieldKind::Uuid),
    field("make", FieldKind::Text),
    field("model", FieldKind::Text),
    field("year", FieldKind::Integer),
    field("license_plate", FieldKind::Text),
    field("type", FieldKind::Text),
    field("status", FieldKind::Text),
    field("last_maintenance", FieldKind::Timestamp),
    field("next_maintenance_due", FieldKind::Timestamp),
    field("mileage", FieldKind::Integer),
    field("fuel_type", FieldKind::Text),
    field("capacity", FieldKind::Text),
    field("notes", FieldKind::Text),
    field("price", FieldKind::Float),
    field("description", FieldKind::Text),
    field("image_url", FieldKind::Text),
    field("images", FieldKind::TextArray),
    field("revenue", FieldKind::Float),
    field("created_at", FieldKind::Timestamp),
    field("updated_at", FieldKind::Timestamp),
];

pub const TRUCK_QUERY: QueryConfig = QueryConfig {
    table: Truck::TABLE,
    fields: FIELDS,
    default_limit: 10,
    max_limit: None,
    default_sort: "-created_at",
    searchable_fields: &["make", "model", "description", "notes"],
    default_fields: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn body() -> serde_json::Value {
        serde_json::json!({
            "make": "Freightliner",
            "model": "Cascadia",
            "year": 2021,
            "license_plate": "TX-1234",
            "last_maintenance": "2024-01-31T00:00:00Z",
            "mileage": 120000
        })
    }

    #[test]
    fn draft_applies_defaults() {
        let truck: NewTruck = serde_json::from_value(body()).unwrap();
        let draft = truck.into_draft().unwrap();
        assert_eq!(draft.kind, "box truck");
        assert_eq!(draft.status, "active");
        assert_eq!(draft.fuel_type, "diesel");
        assert_eq!(draft.price, 0.0);
        assert_eq!(draft.next_maintenance_due, Utc.with_ymd_and_hms(2024, 7, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn explicit_due_date_wins() {
        let mut value = body();
        value["next_maintenance_due"] = "2024-03-01T00:00:00Z".into();
        let draft = serde_json::from_value::<NewTruck>(value).unwrap().into_draft().unwrap();
        assert_eq!(draft.next_maintenance_due, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_and_invalid_fields_are_reported() {
        let truck: NewTruck = serde_json::from_value(serde_json::json!({
            "make": "  ",
            "type": "hovercraft",
            "mileage": -5
        }))
        .unwrap();
        let errors = truck.into_draft().unwrap_err();
        for key in ["make", "model", "year", "license_plate", "last_maintenance", "mileage", "type"] {
            assert!(errors.fields().contains_key(key), "missing error for {}", key);
        }
    }

    #[test]
    fn service_interval_clamps_month_end() {
        let last = Utc.with_ymd_and_hms(2024, 8, 31, 12, 0, 0).unwrap();
        assert_eq!(next_service(last), Some(Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()));
    }

    #[test]
    fn changes_validate_enums() {
        let changes = TruckChanges { status: Some("sold".into()), ..Default::default() };
        assert!(changes.validate().unwrap_err().fields().contains_key("status"));
        assert!(TruckChanges::default().validate().is_ok());
    }
}
