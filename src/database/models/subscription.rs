use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Model;

pub const SUBSCRIPTION_STATUSES: &[&str] = &["active", "inactive", "cancelled", "expired"];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    #[serde(rename = "user")]
    #[sqlx(rename = "user")]
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub payment_type: String,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub listing_count: i32,
    /// `-1` means unlimited.
    pub max_listings: i32,
    pub has_wholesale_access: bool,
    pub created_at: DateTime<Utc>,
}

impl Model for Subscription {
    const TABLE: &'static str = "subscriptions";
    const LABEL: &'static str = "Subscription";
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.end_date.map_or(false, |end| end < now)
    }

    pub fn listings_left(&self) -> Option<i32> {
        (self.max_listings >= 0).then(|| (self.max_listings - self.listing_count).max(0))
    }
}

/// Body of `POST /api/subscriptions`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscription {
    pub plan: Option<String>,
}
