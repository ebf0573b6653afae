use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::trailer::{Trailer, TrailerChanges, TrailerDraft, TrailerStats};

pub const SIMILAR_LIMIT: i64 = 6;
/// Length tolerance, in feet, for "similar" matches.
pub const SIMILAR_LENGTH_RANGE: f64 = 5.0;

pub async fn insert(pool: &PgPool, draft: &TrailerDraft) -> Result<Trailer, DatabaseError> {
    let row = sqlx::query_as::<_, Trailer>(
        r#"INSERT INTO trailers (
               id, make, model, year, type, length, axles, vin_number, price,
               description, features, condition, status, location, image_url,
               images, gvwr, capacity, hitch, suspension, brakes, floor_type,
               color, ramps, owner, created_by)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                   $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(&draft.make)
    .bind(&draft.model)
    .bind(draft.year)
    .bind(&draft.kind)
    .bind(draft.length)
    .bind(draft.axles)
    .bind(&draft.vin_number)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.features)
    .bind(&draft.condition)
    .bind(&draft.status)
    .bind(&draft.location)
    .bind(&draft.image_url)
    .bind(&draft.images)
    .bind(draft.gvwr)
    .bind(draft.capacity)
    .bind(&draft.hitch)
    .bind(&draft.suspension)
    .bind(&draft.brakes)
    .bind(&draft.floor_type)
    .bind(&draft.color)
    .bind(draft.ramps)
    .bind(draft.owner)
    .bind(draft.created_by)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update(pool: &PgPool, id: Uuid, changes: TrailerChanges) -> Result<Trailer, DatabaseError> {
    let features: Option<Vec<String>> = changes.features.map(Vec::from);
    let row = sqlx::query_as::<_, Trailer>(
        r#"UPDATE trailers SET
               make = COALESCE($2, make),
               model = COALESCE($3, model),
               year = COALESCE($4, year),
               type = COALESCE($5, type),
               length = COALESCE($6, length),
               axles = COALESCE($7, axles),
               vin_number = COALESCE($8, vin_number),
               price = COALESCE($9, price),
               description = COALESCE($10, description),
               features = COALESCE($11, features),
               condition = COALESCE($12, condition),
               status = COALESCE($13, status),
               location = COALESCE($14, location),
               image_url = COALESCE($15, image_url),
               images = COALESCE($16, images),
               gvwr = COALESCE($17, gvwr),
               capacity = COALESCE($18, capacity),
               hitch = COALESCE($19, hitch),
               suspension = COALESCE($20, suspension),
               brakes = COALESCE($21, brakes),
               floor_type = COALESCE($22, floor_type),
               color = COALESCE($23, color),
               ramps = COALESCE($24, ramps),
               revenue = COALESCE($25, revenue),
               updated_at = now()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(changes.make.as_deref().map(str::trim))
    .bind(changes.model.as_deref().map(str::trim))
    .bind(changes.year)
    .bind(changes.kind.as_deref().map(str::trim))
    .bind(changes.length)
    .bind(changes.axles)
    .bind(changes.vin_number.as_deref().map(str::trim))
    .bind(changes.price)
    .bind(changes.description.as_deref())
    .bind(features)
    .bind(changes.condition.as_deref())
    .bind(changes.status.as_deref())
    .bind(changes.location.as_deref().map(str::trim))
    .bind(changes.image_url.as_deref())
    .bind(changes.images)
    .bind(changes.gvwr)
    .bind(changes.capacity)
    .bind(changes.hitch.as_deref())
    .bind(changes.suspension.as_deref())
    .bind(changes.brakes.as_deref())
    .bind(changes.floor_type.as_deref())
    .bind(changes.color.as_deref())
    .bind(changes.ramps)
    .bind(changes.revenue)
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| DatabaseError::NotFound("Trailer not found".to_string()))
}

/// Status totals, case-insensitive, optionally limited to the trailers one
/// user created (the same set that user may edit).
pub async fn stats(pool: &PgPool, creator: Option<Uuid>) -> Result<TrailerStats, DatabaseError> {
    let stats = sqlx::query_as::<_, TrailerStats>(
        r#"SELECT
               COUNT(*) AS total_trailers,
               COUNT(*) FILTER (WHERE lower(status) = 'available') AS available_trailers,
               COUNT(*) FILTER (WHERE lower(status) = 'reserved') AS reserved_trailers,
               COUNT(*) FILTER (WHERE lower(status) = 'sold') AS sold_trailers,
               COUNT(*) FILTER (WHERE lower(status) = 'pending') AS pending_trailers
           FROM trailers
           WHERE ($1::uuid IS NULL OR created_by = $1)"#,
    )
    .bind(creator)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

/// Available trailers of the same type sharing the make or within
/// [`SIMILAR_LENGTH_RANGE`] of the length, newest first.
pub async fn similar(pool: &PgPool, trailer: &Trailer) -> Result<Vec<Trailer>, DatabaseError> {
    let rows = sqlx::query_as::<_, Trailer>(
        r#"SELECT * FROM trailers
           WHERE id <> $1
             AND type = $2
             AND (make = $3 OR length BETWEEN $4 - $5 AND $4 + $5)
             AND status = 'Available'
           ORDER BY created_at DESC, id ASC
           LIMIT $6"#,
    )
    .bind(trailer.id)
    .bind(&trailer.kind)
    .bind(&trailer.make)
    .bind(trailer.length)
    .bind(SIMILAR_LENGTH_RANGE)
    .bind(SIMILAR_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
