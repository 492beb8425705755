use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{
    auth::{create_jwt, user_cache_key, AuthUser},
    cache::USER_TTL_SECS,
    errors::user::UserError,
    models::{CreateUser, LoginRequest, LoginResponse, UserResponse},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = CreateUser,
    responses(
        (status = 200, description = "User registered successfully", body = UserResponse),
        (status = 400, description = "Username, email, or mobile number already registered")
    )
)]
async fn register(
    State(state): State<Arc<AppState>>,
    Json(user_data): Json<CreateUser>,
) -> Result<Json<UserResponse>, UserError> {
    let taken = state
        .db
        .identity_exists(
            &user_data.username,
            &user_data.email,
            user_data.mobile_number.as_deref(),
        )
        .await
        .map_err(|e| UserError::internal_server_error(e.to_string()))?;

    if taken {
        return Err(UserError::DuplicateIdentity);
    }

    let user = state
        .db
        .create_user(user_data)
        .await
        .map_err(|e| UserError::internal_server_error(e.to_string()))?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is disabled")
    )
)]
async fn login(
    State(state): State<Arc<AppState>>,
    Json(login_data): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, UserError> {
    let user = state
        .db
        .get_user_by_identifier(&login_data.identifier)
        .await
        .map_err(|e| UserError::internal_server_error(e.to_string()))?
        .ok_or(UserError::InvalidCredentials)?;

    let is_valid = bcrypt::verify(&login_data.password, &user.password_hash)
        .map_err(|e| UserError::internal_server_error(e.to_string()))?;

    if !is_valid {
        return Err(UserError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(UserError::AccountDisabled);
    }

    let token = create_jwt(&user, &state.config.jwt_secret)
        .map_err(|e| UserError::internal_server_error(e.to_string()))?;

    // Prime the cache the AuthUser extractor reads from.
    state
        .cache
        .set(&user_cache_key(user.id), &user, USER_TTL_SECS)
        .await;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current user information", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token")
    )
)]
async fn me(auth_user: AuthUser) -> Json<UserResponse> {
    Json(auth_user.user.into())
}
