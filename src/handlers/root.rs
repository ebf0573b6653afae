use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::database::DatabaseManager;

pub fn routes() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api", get(api_index))
        .route("/health", get(health))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "TruckHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
        }
    }))
}

async fn api_index() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "endpoints": {
                "auth": "/api/auth/register, /api/auth/login (public), /api/auth/me (bearer)",
                "trucks": "/api/trucks[/:id] (list and show public, writes bearer)",
                "trailers": "/api/trailers[/:id] (list and show public, writes bearer)",
                "users": "/api/users[/:id] (admin)",
                "subscriptions": "/api/subscriptions/plans (public), /api/subscriptions[/current|/check] (bearer)",
                "health": "/health",
            },
            "query": {
                "filter": "field=value, field[gt|gte|lt|lte]=value, field[in]=a,b",
                "search": "search=term or q=term",
                "sort": "sort=-price,make",
                "fields": "fields=make,model",
                "pagination": "page=1&limit=10",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
