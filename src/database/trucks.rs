use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::truck::{Truck, TruckChanges, TruckDraft, TruckStats};

pub const RECENT_LIMIT: i64 = 5;

pub async fn insert(pool: &PgPool, owner: Uuid, draft: &TruckDraft) -> Result<Truck, DatabaseError> {
    let row = sqlx::query_as::<_, Truck>(
        r#"INSERT INTO trucks (
               id, owner, make, model, year, license_plate, type, status,
               last_maintenance, next_maintenance_due, mileage, fuel_type,
               capacity, notes, price, description, image_url, images)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(&draft.make)
    .bind(&draft.model)
    .bind(draft.year)
    .bind(&draft.license_plate)
    .bind(&draft.kind)
    .bind(&draft.status)
    .bind(draft.last_maintenance)
    .bind(draft.next_maintenance_due)
    .bind(draft.mileage)
    .bind(&draft.fuel_type)
    .bind(&draft.capacity)
    .bind(&draft.notes)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.image_url)
    .bind(&draft.images)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: &TruckChanges) -> Result<Truck, DatabaseError> {
    let row = sqlx::query_as::<_, Truck>(
        r#"UPDATE trucks SET
               make = COALESCE($2, make),
               model = COALESCE($3, model),
               year = COALESCE($4, year),
               license_plate = COALESCE($5, license_plate),
               type = COALESCE($6, type),
               status = COALESCE($7, status),
               last_maintenance = COALESCE($8, last_maintenance),
               next_maintenance_due = COALESCE($9, next_maintenance_due),
               mileage = COALESCE($10, mileage),
               fuel_type = COALESCE($11, fuel_type),
               capacity = COALESCE($12, capacity),
               notes = COALESCE($13, notes),
               price = COALESCE($14, price),
               description = COALESCE($15, description),
               image_url = COALESCE($16, image_url),
               images = COALESCE($17, images),
               revenue = COALESCE($18, revenue),
               updated_at = now()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(changes.make.as_deref().map(str::trim))
    .bind(changes.model.as_deref().map(str::trim))
    .bind(changes.year)
    .bind(changes.license_plate.as_deref().map(str::trim))
    .bind(changes.kind.as_deref())
    .bind(changes.status.as_deref())
    .bind(changes.last_maintenance)
    .bind(changes.next_maintenance_due)
    .bind(changes.mileage)
    .bind(changes.fuel_type.as_deref())
    .bind(changes.capacity.as_deref())
    .bind(changes.notes.as_deref())
    .bind(changes.price)
    .bind(changes.description.as_deref())
    .bind(changes.image_url.as_deref())
    .bind(changes.images.as_deref())
    .bind(changes.revenue)
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| DatabaseError::NotFound("Truck not found".to_string()))
}

/// Totals across `owner`'s trucks, or every truck when `owner` is `None`.
pub async fn stats(pool: &PgPool, owner: Option<Uuid>) -> Result<TruckStats, DatabaseError> {
    let stats = sqlx::query_as::<_, TruckStats>(
        r#"SELECT
               COUNT(*) AS total_trucks,
               COUNT(*) FILTER (WHERE status = 'active') AS active_trucks,
               COUNT(*) FILTER (WHERE status = 'maintenance') AS maintenance_trucks,
               COUNT(*) FILTER (WHERE status = 'retired') AS retired_trucks,
               COALESCE(SUM(revenue), 0)::double precision AS revenue
           FROM trucks
           WHERE ($1::uuid IS NULL OR owner = $1)"#,
    )
    .bind(owner)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

pub async fn recent(pool: &PgPool, owner: Option<Uuid>) -> Result<Vec<Truck>, DatabaseError> {
    let rows = sqlx::query_as::<_, Truck>(
        r#"SELECT * FROM trucks
           WHERE ($1::uuid IS NULL OR owner = $1)
           ORDER BY updated_at DESC, id ASC
           LIMIT $2"#,
    )
    .bind(owner)
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
