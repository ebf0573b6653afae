use axum::{
    extract::{Path, Query, RawQuery},
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{db, listing, parse_id, run_listing};
use crate::database::models::trailer::{NewTrailer, Trailer, TrailerChanges, TrailerStats, TRAILER_QUERY};
use crate::database::{trailers, Repository};
use crate::error::ApiError;
use crate::middleware::{jwt_auth_middleware, ApiResponse, ApiResult, AuthUser, ListResponse};

pub fn routes() -> Router {
    let public = Router::new()
        .route("/api/trailers", get(list_trailers))
        .route("/api/trailers/stats", get(trailer_stats))
        .route("/api/trailers/:id", get(show_trailer))
        .route("/api/trailers/:id/similar", get(similar_trailers));

    let protected = Router::new()
        .route("/api/trailers", post(create_trailer))
        .route("/api/trailers/:id", patch(update_trailer).delete(delete_trailer))
        .route_layer(middleware::from_fn(jwt_auth_middleware));

    public.merge(protected)
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub owner: Option<String>,
}

/// GET /api/trailers
async fn list_trailers(RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    run_listing(listing(TRAILER_QUERY, query.as_deref())).await
}

/// GET /api/trailers/stats?owner=<id>
///
/// Counts the trailers `owner` created. An id that does not parse matches no
/// trailers, so it reports zeros.
async fn trailer_stats(Query(query): Query<StatsQuery>) -> ApiResult<TrailerStats> {
    let owner = match query.owner.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => return Ok(ApiResponse::success(TrailerStats::default())),
        },
    };
    Ok(ApiResponse::success(trailers::stats(&db().await?, owner).await?))
}

/// GET /api/trailers/:id
async fn show_trailer(Path(id): Path<String>) -> ApiResult<Trailer> {
    let id = parse_id(&id)?;
    let trailer = Repository::<Trailer>::new(db().await?).select_404(id).await?;
    Ok(ApiResponse::success(trailer))
}

/// GET /api/trailers/:id/similar
async fn similar_trailers(Path(id): Path<String>) -> ApiResult<Vec<Trailer>> {
    let id = parse_id(&id)?;
    let pool = db().await?;
    let trailer = Repository::<Trailer>::new(pool.clone()).select_404(id).await?;
    Ok(ApiResponse::success(trailers::similar(&pool, &trailer).await?))
}

/// POST /api/trailers
///
/// The caller is always the creator. Only admins may list on behalf of
/// another owner.
async fn create_trailer(Extension(user): Extension<AuthUser>, Json(body): Json<NewTrailer>) -> ApiResult<Trailer> {
    let assigned_owner = body.owner;
    let mut draft = body.into_draft(user.user_id, Utc::now())?;
    if let Some(owner) = assigned_owner.filter(|_| user.is_admin()) {
        draft.owner = owner;
    }

    let trailer = trailers::insert(&db().await?, &draft).await?;
    info!("User {} listed trailer {}", user.user_id, trailer.id);
    Ok(ApiResponse::created(trailer))
}

/// PATCH /api/trailers/:id
async fn update_trailer(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(changes): Json<TrailerChanges>,
) -> ApiResult<Trailer> {
    let id = parse_id(&id)?;
    changes.validate(Utc::now())?;

    let pool = db().await?;
    let trailer = Repository::<Trailer>::new(pool.clone()).select_404(id).await?;
    if !user.can_modify(Some(trailer.created_by)) {
        return Err(ApiError::forbidden("Not authorized to update this trailer"));
    }

    Ok(ApiResponse::success(trailers::update(&pool, id, changes).await?))
}

/// DELETE /api/trailers/:id
async fn delete_trailer(Extension(user): Extension<AuthUser>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let repository = Repository::<Trailer>::new(db().await?);
    let trailer = repository.select_404(id).await?;
    if !user.can_modify(Some(trailer.created_by)) {
        return Err(ApiError::forbidden("Not authorized to delete this trailer"));
    }

    repository.delete(id).await?;
    info!("User {} deleted trailer {}", user.user_id, id);
    Ok(ApiResponse::success(json!({})))
}
