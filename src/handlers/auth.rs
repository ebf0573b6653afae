use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::db;
use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::database::models::user::{NewUser, Role, User, UserProfile};
use crate::database::models::ValidationErrors;
use crate::database::{users, Repository};
use crate::error::ApiError;
use crate::middleware::{jwt_auth_middleware, ApiResponse, ApiResult, AuthUser};

pub fn routes() -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login));

    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(middleware::from_fn(jwt_auth_middleware));

    public.merge(protected)
}

/// `{ success, token, user }`, the shape both register and login answer with.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

impl TokenResponse {
    pub fn issue(user: User) -> Result<Self, ApiError> {
        let claims = Claims::new(user.id, user.email.clone(), user.role.clone())?;
        let token = generate_jwt(&claims)?;
        Ok(Self { success: true, token, user: user.into() })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/register
async fn register(Json(body): Json<NewUser>) -> Result<Response, ApiError> {
    let role = body.validate()?;
    if role == Role::Admin {
        let mut errors = ValidationErrors::new();
        errors.add("role", "Cannot register as admin");
        return Err(errors.into());
    }

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

    info!("Registered user {} as {}", user.id, user.role);
    Ok((StatusCode::CREATED, Json(TokenResponse::issue(user)?)).into_response())
}

/// POST /api/auth/login
async fn login(Json(body): Json<LoginRequest>) -> Result<Json<TokenResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        body.email.as_deref().filter(|e| !e.trim().is_empty()),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let pool = db().await?;
    let user = match users::find_by_email(&pool, email).await? {
        Some(user) if verify_password(password, &user.password_hash) => user,
        _ => {
            info!("Failed login for {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    Ok(Json(TokenResponse::issue(user)?))
}

/// GET /api/auth/me
async fn me(Extension(auth): Extension<AuthUser>) -> ApiResult<UserProfile> {
    let pool = db().await?;
    let user = Repository::<User>::new(pool).select_404(auth.user_id).await?;
    Ok(ApiResponse::success(user.into()))
}
