use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;

use super::db;
use crate::database::models::subscription::{NewSubscription, Subscription};
use crate::error::ApiError;
use crate::middleware::{jwt_auth_middleware, ApiResponse, ApiResult, AuthUser};
use crate::services::subscription_service::{Plan, SubscriptionCheck, PLANS};
use crate::services::{SubscriptionError, SubscriptionService};

pub fn routes() -> Router {
    let public = Router::new().route("/api/subscriptions/plans", get(list_plans));

    let protected = Router::new()
        .route("/api/subscriptions", post(create_subscription))
        .route("/api/subscriptions/current", get(current_subscription))
        .route("/api/subscriptions/check", get(check_subscription))
        .route_layer(middleware::from_fn(jwt_auth_middleware));

    public.merge(protected)
}

/// GET /api/subscriptions/plans - catalog keyed by plan id
async fn list_plans() -> ApiResponse<BTreeMap<&'static str, &'static Plan>> {
    ApiResponse::success(PLANS.iter().map(|plan| (plan.id, plan)).collect())
}

/// POST /api/subscriptions
async fn create_subscription(
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewSubscription>,
) -> ApiResult<Subscription> {
    let plan = body.plan.as_deref().ok_or(SubscriptionError::InvalidPlan)?;
    let service = SubscriptionService::new(db().await?);
    Ok(ApiResponse::created(service.create(user.user_id, plan).await?))
}

/// GET /api/subscriptions/current
async fn current_subscription(Extension(user): Extension<AuthUser>) -> ApiResult<Subscription> {
    let service = SubscriptionService::new(db().await?);
    let subscription = service.current(user.user_id).await?.ok_or(SubscriptionError::NotFound)?;
    Ok(ApiResponse::success(subscription))
}

#[derive(Serialize)]
struct CheckResponse {
    success: bool,
    #[serde(flatten)]
    check: SubscriptionCheck,
}

/// GET /api/subscriptions/check
async fn check_subscription(Extension(user): Extension<AuthUser>) -> Result<Response, ApiError> {
    let service = SubscriptionService::new(db().await?);
    let check = service.check(user.user_id).await?;
    Ok((StatusCode::OK, Json(CheckResponse { success: true, check })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn plans_are_public() {
        let response = routes()
            .oneshot(Request::builder().uri("/api/subscriptions/plans").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["data"]["solo_shot"]["payment_type"], "one_time");
        assert_eq!(body["data"]["dealer_deluxe"]["max_listings"], -1);
        assert_eq!(body["data"].as_object().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn lifecycle_routes_require_a_token() {
        for uri in ["/api/subscriptions/current", "/api/subscriptions/check"] {
            let response = routes()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
