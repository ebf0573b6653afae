use axum::{
    extract::{Path, RawQuery},
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use super::{db, listing, parse_id, run_listing, scoped_listing};
use crate::database::models::truck::{NewTruck, Truck, TruckChanges, TruckStats, TRUCK_QUERY};
use crate::database::{trucks, Repository};
use crate::error::ApiError;
use crate::middleware::{jwt_auth_middleware, ApiResponse, ApiResult, AuthUser, ListResponse};

pub fn routes() -> Router {
    let public = Router::new()
        .route("/api/trucks", get(list_trucks))
        .route("/api/trucks/dealer/:id", get(dealer_trucks))
        .route("/api/trucks/:id", get(show_truck));

    let protected = Router::new()
        .route("/api/trucks", post(create_truck))
        .route("/api/trucks/stats", get(truck_stats))
        .route("/api/trucks/recent", get(recent_trucks))
        .route("/api/trucks/:id", put(update_truck).delete(delete_truck))
        .route_layer(middleware::from_fn(jwt_auth_middleware));

    public.merge(protected)
}

/// GET /api/trucks
async fn list_trucks(RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    run_listing(listing(TRUCK_QUERY, query.as_deref())).await
}

/// GET /api/trucks/dealer/:id - one owner's trucks through the same query pipeline
async fn dealer_trucks(Path(id): Path<String>, RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    let owner = parse_id(&id)?;
    run_listing(scoped_listing(TRUCK_QUERY, &[("owner", owner.to_string())], query.as_deref())).await
}

/// GET /api/trucks/:id
async fn show_truck(Path(id): Path<String>) -> ApiResult<Truck> {
    let id = parse_id(&id)?;
    let truck = Repository::<Truck>::new(db().await?).select_404(id).await?;
    Ok(ApiResponse::success(truck))
}

/// POST /api/trucks
async fn create_truck(Extension(user): Extension<AuthUser>, Json(body): Json<NewTruck>) -> ApiResult<Truck> {
    let draft = body.into_draft()?;
    let truck = trucks::insert(&db().await?, user.user_id, &draft).await?;
    info!("User {} listed truck {}", user.user_id, truck.id);
    Ok(ApiResponse::created(truck))
}

/// PUT /api/trucks/:id
async fn update_truck(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(changes): Json<TruckChanges>,
) -> ApiResult<Truck> {
    let id = parse_id(&id)?;
    changes.validate()?;

    let pool = db().await?;
    let truck = Repository::<Truck>::new(pool.clone()).select_404(id).await?;
    if !user.can_modify(Some(truck.owner)) {
        return Err(ApiError::forbidden("User not authorized to update this truck"));
    }

    Ok(ApiResponse::success(trucks::update(&pool, id, &changes).await?))
}

/// DELETE /api/trucks/:id
async fn delete_truck(Extension(user): Extension<AuthUser>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let repository = Repository::<Truck>::new(db().await?);
    let truck = repository.select_404(id).await?;
    if !user.can_modify(Some(truck.owner)) {
        return Err(ApiError::forbidden("User not authorized to delete this truck"));
    }

    repository.delete(id).await?;
    info!("User {} deleted truck {}", user.user_id, id);
    Ok(ApiResponse::success(json!({})))
}

/// GET /api/trucks/stats - admins see every truck, everyone else their own
async fn truck_stats(Extension(user): Extension<AuthUser>) -> ApiResult<TruckStats> {
    let owner = (!user.is_admin()).then_some(user.user_id);
    Ok(ApiResponse::success(trucks::stats(&db().await?, owner).await?))
}

/// GET /api/trucks/recent
async fn recent_trucks(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Truck>> {
    let owner = (!user.is_admin()).then_some(user.user_id);
    Ok(ApiResponse::success(trucks::recent(&db().await?, owner).await?))
}
