/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register new user
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Exchange a refresh token for an access token
/// - `GET /api/auth/me` - Current user profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{data, ApiJson, DataResponse},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskdeck_shared::{
    auth::{
        jwt::{self, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::user::{normalize_email, CreateUser, Role, User},
    store::UserStore,
    validation::{from_validator, FieldError},
};
use tracing::info;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Name is required (at most 50 characters)"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    /// Checked by `validate_password_strength`
    #[serde(default)]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Tokens plus the authenticated user, returned by register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,

    #[serde(flatten)]
    pub tokens: TokenPair,

    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,

    /// New access token (24h)
    pub token: String,

    pub expires_in: i64,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

/// Register a new user
///
/// The configured bootstrap admin email receives the `admin` role; everyone
/// else is a `member`.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed (all fields reported)
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.name = req.name.trim().to_string();
    req.email = normalize_email(&req.email);

    let mut errors = match req.validate() {
        Ok(()) => Vec::new(),
        Err(e) => from_validator(&e),
    };
    if let Err(msg) = password::validate_password_strength(&req.password) {
        errors.push(FieldError::new("password", msg));
    }
    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let role = if state.config.admin_email.as_deref() == Some(req.email.as_str()) {
        Role::Admin
    } else {
        Role::Member
    };

    let password_hash = password::hash_password(&req.password)?;
    let user = state
        .store
        .create_user(CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "User registered");

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            tokens,
            user,
        }),
    ))
}

/// Login endpoint
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(from_validator(&e)))?;

    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        info!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid_credentials());
    }

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        success: true,
        tokens,
        user,
    }))
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or the user is gone
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let token = jwt::create_token(&jwt::Claims::new(claims.sub, TokenType::Access), state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        success: true,
        token,
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}

/// Current user profile
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DataResponse<User>>> {
    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(data(user))
}
