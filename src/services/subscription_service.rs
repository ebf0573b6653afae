use chrono::{DateTime, Months, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    OneTime,
    Monthly,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::OneTime => "one_time",
            PaymentType::Monthly => "monthly",
        }
    }

    /// How long one payment keeps the subscription active.
    pub fn term(&self) -> Months {
        match self {
            PaymentType::OneTime => Months::new(12),
            PaymentType::Monthly => Months::new(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    #[serde(skip)]
    pub id: &'static str,
    pub name: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// `-1` means unlimited.
    pub max_listings: i32,
    pub payment_type: PaymentType,
    pub has_wholesale_access: bool,
    pub features: &'static [&'static str],
}

impl Plan {
    /// Role granted to a non-admin subscriber.
    pub fn granted_role(&self) -> &'static str {
        if self.has_wholesale_access { "dealer" } else { "seller" }
    }
}

pub static PLANS: Lazy<Vec<Plan>> = Lazy::new(|| {
    vec![
        Plan {
            id: "solo_shot",
            name: "Solo Shot",
            price: Decimal::new(4999, 2),
            max_listings: 1,
            payment_type: PaymentType::OneTime,
            has_wholesale_access: false,
            features: &["One-time payment", "1 listing", "Basic support"],
        },
        Plan {
            id: "trucker_basic",
            name: "Trucker Basic",
            price: Decimal::new(9999, 2),
            max_listings: 5,
            payment_type: PaymentType::Monthly,
            has_wholesale_access: false,
            features: &["Monthly subscription", "Up to 5 listings", "Priority support"],
        },
        Plan {
            id: "fleet_pro",
            name: "Fleet Pro",
            price: Decimal::new(19999, 2),
            max_listings: 10,
            payment_type: PaymentType::Monthly,
            has_wholesale_access: false,
            features: &["Monthly subscription", "Up to 10 listings", "Premium support"],
        },
        Plan {
            id: "fleet_enterprise",
            name: "Fleet Enterprise",
            price: Decimal::new(39999, 2),
            max_listings: -1,
            payment_type: PaymentType::Monthly,
            has_wholesale_access: false,
            features: &["Monthly subscription", "Unlimited listings", "24/7 support"],
        },
        Plan {
            id: "dealer_deluxe",
            name: "Dealer Deluxe",
            price: Decimal::new(59999, 2),
            max_listings: -1,
            payment_type: PaymentType::Monthly,
            has_wholesale_access: true,
            features: &["Monthly subscription", "Unlimited listings", "Wholesale access", "24/7 premium support"],
        },
    ]
});

pub fn find_plan(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id == id)
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Invalid plan selected")]
    InvalidPlan,
    #[error("User already has an active subscription")]
    AlreadyActive,
    #[error("No active subscription found")]
    NotFound,
    #[error("Subscription end date out of range")]
    DateOutOfRange,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for SubscriptionError {
    fn from(err: sqlx::Error) -> Self {
        SubscriptionError::Database(err.into())
    }
}

/// Outcome of `check`. `summary` is set only while a subscription is live.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCheck {
    pub has_active_subscription: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(rename = "data", skip_serializing_if = "Option::is_none")]
    pub summary: Option<SubscriptionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub plan: String,
    pub end_date: Option<DateTime<Utc>>,
    pub max_listings: i32,
    pub has_wholesale_access: bool,
}

pub struct SubscriptionService {
    pool: PgPool,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts `plan_id` for `user_id` and marks the user as subscribed, in
    /// one transaction.
    pub async fn create(&self, user_id: Uuid, plan_id: &str) -> Result<Subscription, SubscriptionError> {
        let plan = find_plan(plan_id).ok_or(SubscriptionError::InvalidPlan)?;
        if self.current(user_id).await?.is_some() {
            return Err(SubscriptionError::AlreadyActive);
        }

        let start = Utc::now();
        let end = start
            .checked_add_months(plan.payment_type.term())
            .ok_or(SubscriptionError::DateOutOfRange)?;

        let mut tx = self.pool.begin().await?;
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"INSERT INTO subscriptions (
                   id, "user", plan, status, start_date, end_date, payment_type,
                   last_payment_date, next_payment_date, max_listings, has_wholesale_access)
               VALUES ($1, $2, $3, 'active', $4, $5, $6, $4, $5, $7, $8)
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(plan.id)
        .bind(start)
        .bind(end)
        .bind(plan.payment_type.as_str())
        .bind(plan.max_listings)
        .bind(plan.has_wholesale_access)
        .fetch_one(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r#"UPDATE users SET
                   subscription_status = 'active',
                   current_plan = $2,
                   subscription_end_date = $3,
                   role = CASE WHEN role = 'admin' THEN role ELSE $4 END,
                   updated_at = now()
               WHERE id = $1"#,
        )
        .bind(user_id)
        .bind(plan.id)
        .bind(end)
        .bind(plan.granted_role())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()).into());
        }

        tx.commit().await?;
        info!("User {} subscribed to {}", user_id, plan.id);
        Ok(subscription)
    }

    pub async fn current(&self, user_id: Uuid) -> Result<Option<Subscription>, SubscriptionError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"SELECT * FROM subscriptions
               WHERE "user" = $1 AND status = 'active'
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    /// Reports whether the user is subscribed, expiring a lapsed subscription
    /// and resetting the user's plan on the way.
    pub async fn check(&self, user_id: Uuid) -> Result<SubscriptionCheck, SubscriptionError> {
        let Some(subscription) = self.current(user_id).await? else {
            return Ok(SubscriptionCheck {
                has_active_subscription: false,
                message: Some("No active subscription found"),
                summary: None,
            });
        };

        if subscription.has_lapsed(Utc::now()) {
            self.expire(&subscription).await?;
            return Ok(SubscriptionCheck {
                has_active_subscription: false,
                message: Some("Subscription has expired"),
                summary: None,
            });
        }

        Ok(SubscriptionCheck {
            has_active_subscription: true,
            message: None,
            summary: Some(SubscriptionSummary {
                plan: subscription.plan,
                end_date: subscription.end_date,
                max_listings: subscription.max_listings,
                has_wholesale_access: subscription.has_wholesale_access,
            }),
        })
    }

    async fn expire(&self, subscription: &Subscription) -> Result<(), SubscriptionError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE subscriptions SET status = 'expired' WHERE id = $1")
            .bind(subscription.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"UPDATE users SET
                   subscription_status = 'expired',
                   current_plan = 'none',
                   updated_at = now()
               WHERE id = $1"#,
        )
        .bind(subscription.user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        info!("Subscription {} expired", subscription.id);
        Ok(())
    }
}
