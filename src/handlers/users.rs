use axum::{
    extract::{Path, RawQuery},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{db, listing, parse_id, run_listing};
use crate::auth::hash_password;
use crate::database::models::user::{NewUser, User, UserChanges, USER_QUERY};
use crate::database::{users, Repository};
use crate::error::ApiError;
use crate::middleware::{jwt_auth_middleware, require_admin, ApiResponse, ApiResult, AuthUser, ListResponse};

/// Admin-only user management under `/api/users`.
pub fn routes() -> Router {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", get(show_user).put(update_user).delete(delete_user))
        // The last layer added runs first: authenticate, then check the role.
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

/// GET /api/users
async fn list_users(RawQuery(query): RawQuery) -> Result<ListResponse, ApiError> {
    run_listing(listing(USER_QUERY, query.as_deref())).await
}

/// GET /api/users/:id
async fn show_user(Path(id): Path<String>) -> ApiResult<User> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(Repository::<User>::new(db().await?).select_404(id).await?))
}

/// POST /api/users
async fn create_user(Extension(admin): Extension<AuthUser>, Json(body): Json<NewUser>) -> ApiResult<User> {
    let role = body.validate()?;
    let email = body.email.as_deref().unwrap_or_default();

    let pool = db().await?;
    if users::email_taken(&pool, email, None).await? {
        return Err(ApiError::bad_request("User already exists"));
    }

    let password_hash = hash_password(body.password.as_deref().unwrap_or_default())?;
    let user = users::insert(
        &pool,
        users::UserInsert {
            name: body.name.as_deref().unwrap_or_default(),
            email,
            role,
            phone: body.phone.as_deref(),
            location: body.location.as_ref(),
            password_hash: &password_hash,
        },
    )
    .await?;

    info!("Admin {} created user {} as {}", admin.user_id, user.id, user.role);
    Ok(ApiResponse::created(user))
}

/// PUT /api/users/:id
async fn update_user(Path(id): Path<String>, Json(changes): Json<UserChanges>) -> ApiResult<User> {
    let id = parse_id(&id)?;
    changes.validate()?;

    let pool = db().await?;
    if let Some(email) = changes.email.as_deref() {
        if users::email_taken(&pool, email, Some(id)).await? {
            return Err(ApiError::bad_request("Email already in use"));
        }
    }

    let password_hash = changes.password.as_deref().map(hash_password).transpose()?;
    let user = users::update(&pool, id, &changes, password_hash.as_deref()).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id
async fn delete_user(Extension(admin): Extension<AuthUser>, Path(id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&id)?;
    let pool = db().await?;
    let repository = Repository::<User>::new(pool.clone());
    let user = repository.select_404(id).await?;

    if user.role == "admin" && users::count_admins(&pool).await? <= 1 {
        warn!("Admin {} tried to delete the last admin {}", admin.user_id, id);
        return Err(ApiError::bad_request("Cannot delete the last admin user"));
    }

    repository.delete(id).await?;
    info!("Admin {} deleted user {}", admin.user_id, id);
    Ok(ApiResponse::success(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt, Claims};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn status_with_role(role: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri("/api/users");
        if let Some(role) = role {
            let token = generate_jwt(&Claims::new(Uuid::new_v4(), "u@example.com", role).unwrap()).unwrap();
            request = request.header("authorization", format!("Bearer {}", token));
        }
        routes().oneshot(request.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn anonymous_callers_are_unauthorized() {
        assert_eq!(status_with_role(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        assert_eq!(status_with_role(Some("seller")).await, StatusCode::FORBIDDEN);
        assert_eq!(status_with_role(Some("buyer")).await, StatusCode::FORBIDDEN);
    }
}
