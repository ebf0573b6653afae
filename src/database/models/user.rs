use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{Model, ValidationErrors};
use crate::filter::{field, FieldKind, FieldSpec, QueryConfig};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<Json<Location>>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub subscription_status: String,
    pub current_plan: String,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model for User {
    const TABLE: &'static str = "users";
    const LABEL: &'static str = "User";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(alias = "zipCode")]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Seller,
    Dealer,
    Admin,
}

impl Role {
    pub const ALL: [&'static str; 4] = ["buyer", "seller", "dealer", "admin"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Dealer => "dealer",
            Role::Admin => "admin",
        }
    }

    /// Sellers and dealers list assets and need contact details.
    pub fn needs_contact_details(&self) -> bool {
        matches!(self, Role::Seller | Role::Dealer)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "dealer" => Ok(Role::Dealer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public profile returned by the auth endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            location: user.location.map(|l| l.0),
            created_at: user.created_at,
        }
    }
}

/// Fields accepted when creating a user, by registration or by an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Location>,
}

impl NewUser {
    pub fn validate(&self) -> Result<Role, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        errors.check(!name.is_empty(), "name", "Please add a name");

        match self.email.as_deref() {
            None | Some("") => errors.add("email", "Please add an email"),
            Some(email) => errors.check(is_valid_email(email), "email", "Please add a valid email"),
        }

        match self.password.as_deref() {
            None | Some("") => errors.add("password", "Please add a password"),
            Some(p) => errors.check(p.chars().count() >= MIN_PASSWORD_LEN, "password", PASSWORD_TOO_SHORT),
        }

        if let Some(phone) = self.phone.as_deref() {
            errors.check(is_valid_phone(phone), "phone", "Please enter a valid phone number");
        }

        let role = match self.role.as_deref() {
            None => Role::Buyer,
            Some(r) => r.parse().unwrap_or_else(|_| {
                errors.add("role", format!("role must be one of: {}", Role::ALL.join(", ")));
                Role::Buyer
            }),
        };

        if role.needs_contact_details() {
            if self.phone.as_deref().map_or(true, str::is_empty) {
                errors.add("phone", "Phone number is required for sellers and dealers");
            }
            let has_zip = self
                .location
                .as_ref()
                .and_then(|l| l.zip_code.as_deref())
                .map_or(false, |z| !z.trim().is_empty());
            errors.check(has_zip, "location", "Location with zip code is required for sellers and dealers");
        }

        errors.into_result().map(|_| role)
    }
}

/// Partial update applied by an admin. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub location: Option<Location>,
    pub subscription_status: Option<String>,
    pub current_plan: Option<String>,
}

impl UserChanges {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = self.name.as_deref() {
            errors.check(!name.trim().is_empty(), "name", "Please add a name");
        }
        if let Some(email) = self.email.as_deref() {
            errors.check(is_valid_email(email), "email", "Please add a valid email");
        }
        if let Some(p) = self.password.as_deref() {
            errors.check(p.chars().count() >= MIN_PASSWORD_LEN, "password", PASSWORD_TOO_SHORT);
        }
        if let Some(phone) = self.phone.as_deref() {
            errors.check(is_valid_phone(phone), "phone", "Please enter a valid phone number");
        }
        super::check_one_of(&mut errors, "role", self.role.as_deref(), &Role::ALL);
        super::check_one_of(
            &mut errors,
            "subscription_status",
            self.subscription_status.as_deref(),
            &["none", "pending", "active", "expired"],
        );
        errors.into_result()
    }
}

pub const MIN_PASSWORD_LEN: usize = 6;
const PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters";

/// `local@domain.tld` where both sides are word characters separated by
/// single `.` or `-`, and the final label is 2 or 3 characters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else { return false };
    if domain.contains('@') || !is_dotted_words(local) || !is_dotted_words(domain) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((_, tld)) => (2..=3).contains(&tld.len()) && tld.chars().all(is_word_char),
        None => false,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_dotted_words(s: &str) -> bool {
    !s.is_empty()
        && s.split(|c| c == '.' || c == '-')
            .all(|part| !part.is_empty() && part.chars().all(is_word_char))
}

/// Ten digits, optionally preceded by `+` and a 1-3 digit country code with
/// an optional `-` or space separator.
pub fn is_valid_phone(phone: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let Some(rest) = phone.strip_prefix('+') else {
        return phone.len() == 10 && all_digits(phone);
    };
    if rest.len() < 11 || !rest.is_char_boundary(rest.len() - 10) {
        return false;
    }
    let (prefix, number) = rest.split_at(rest.len() - 10);
    let code = prefix.strip_suffix(['-', ' ']).unwrap_or(prefix);
    all_digits(number) && all_digits(code) && code.len() <= 3
}

const FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Uuid),
    field("name", FieldKind::Text),
    field("email", FieldKind::Text),
    field("role", FieldKind::Text),
    field("phone", FieldKind::Text),
    field("location", FieldKind::Json),
    field("subscription_status", FieldKind::Text),
    field("current_plan", FieldKind::Text),
    field("subscription_end_date", FieldKind::Timestamp),
    field("created_at", FieldKind::Timestamp),
    field("updated_at", FieldKind::Timestamp),
];

pub const USER_QUERY: QueryConfig = QueryConfig {
    table: User::TABLE,
    fields: FIELDS,
    default_limit: 25,
    max_limit: None,
    default_sort: "-created_at",
    searchable_fields: &["name", "email"],
    default_fields: Some(&["name", "email", "role", "phone", "location", "created_at"]),
};

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(role: Option<&str>) -> NewUser {
        NewUser {
            name: Some("Pat Hauler".into()),
            email: Some("pat@example.com".into()),
            password: Some("secret1".into()),
            role: role.map(String::from),
            phone: None,
            location: None,
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("pat.hauler@truck-hub.com"));
        assert!(is_valid_email("a_b@mail.co.uk"));
        assert!(!is_valid_email("pat@localhost"));
        assert!(!is_valid_email("pat@@example.com"));
        assert!(!is_valid_email("pat@example.info"));
        assert!(!is_valid_email("pat..x@example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn phone_shapes() {
        assert!(is_valid_phone("5551234567"));
        assert!(is_valid_phone("+15551234567"));
        assert!(is_valid_phone("+44 5551234567"));
        assert!(is_valid_phone("+353-5551234567"));
        assert!(!is_valid_phone("555123456"));
        assert!(!is_valid_phone("+12345551234567"));
        assert!(!is_valid_phone("555-123-4567"));
    }

    #[test]
    fn buyers_need_no_contact_details() {
        assert_eq!(new_user(None).validate().unwrap(), Role::Buyer);
    }

    #[test]
    fn sellers_need_phone_and_zip() {
        let errors = new_user(Some("seller")).validate().unwrap_err();
        assert!(errors.fields().contains_key("phone"));
        assert!(errors.fields().contains_key("location"));

        let mut seller = new_user(Some("dealer"));
        seller.phone = Some("5551234567".into());
        seller.location = Some(Location { zip_code: Some("60601".into()), ..Default::default() });
        assert_eq!(seller.validate().unwrap(), Role::Dealer);
    }

    #[test]
    fn rejects_short_password_and_unknown_role() {
        let mut user = new_user(Some("captain"));
        user.password = Some("12345".into());
        let errors = user.validate().unwrap_err();
        assert!(errors.fields().contains_key("password"));
        assert!(errors.fields().contains_key("role"));
    }

    #[test]
    fn location_accepts_camel_case_zip() {
        let loc: Location = serde_json::from_str(r#"{"city":"Tulsa","zipCode":"74103"}"#).unwrap();
        assert_eq!(loc.zip_code.as_deref(), Some("74103"));
    }
}
