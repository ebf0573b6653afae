use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::user::{Location, Role, User, UserChanges};

/// Validated fields for a new `users` row.
pub struct UserInsert<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub phone: Option<&'a str>,
    pub location: Option<&'a Location>,
    pub password_hash: &'a str,
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// True when `email` belongs to any user other than `except`.
pub async fn email_taken(pool: &PgPool, email: &str, except: Option<Uuid>) -> Result<bool, DatabaseError> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1) AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(email.trim())
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

pub async fn insert(pool: &PgPool, user: UserInsert<'_>) -> Result<User, DatabaseError> {
    let row = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, name, email, role, phone, location, password_hash)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(user.name.trim())
    .bind(user.email.trim().to_lowercase())
    .bind(user.role.as_str())
    .bind(user.phone)
    .bind(user.location.map(Json))
    .bind(user.password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Applies the present fields of `changes`; `password_hash` replaces the
/// stored hash when given.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &UserChanges,
    password_hash: Option<&str>,
) -> Result<User, DatabaseError> {
    let row = sqlx::query_as::<_, User>(
        r#"UPDATE users SET
               name = COALESCE($2, name),
               email = COALESCE($3, email),
               role = COALESCE($4, role),
               phone = COALESCE($5, phone),
               location = COALESCE($6, location),
               password_hash = COALESCE($7, password_hash),
               subscription_status = COALESCE($8, subscription_status),
               current_plan = COALESCE($9, current_plan),
               updated_at = now()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(changes.name.as_deref().map(str::trim))
    .bind(changes.email.as_deref().map(|e| e.trim().to_lowercase()))
    .bind(changes.role.as_deref())
    .bind(changes.phone.as_deref())
    .bind(changes.location.as_ref().map(Json))
    .bind(password_hash)
    .bind(changes.subscription_status.as_deref())
    .bind(changes.current_plan.as_deref())
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

pub async fn count_admins(pool: &PgPool) -> Result<i64, DatabaseError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
