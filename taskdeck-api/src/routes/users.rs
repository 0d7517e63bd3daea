/// User endpoints
///
/// # Endpoints
///
/// - `GET /api/users` - List all users (admin)
/// - `GET /api/users/:id` - Fetch a profile (self or admin)
/// - `PUT /api/users/:id` - Update a profile (self or admin; `role` is admin-only)
/// - `DELETE /api/users/:id` - Delete a user (admin)
///
/// Deleting a user leaves their tasks in place; references to them resolve
/// to `null` from then on.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{data, list, message, ApiJson, ApiPath, DataResponse, MessageResponse},
};
use axum::{extract::State, Json};
use serde::Deserialize;
use taskdeck_shared::{
    auth::{
        authorization::{require_admin, require_self_or_admin, AuthzError},
        middleware::AuthContext,
        password,
    },
    models::user::{normalize_email, Role, UpdateUser, User},
    store::UserStore,
    validation::{from_validator, FieldError},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Profile update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,

    pub password: Option<String>,

    pub role: Option<Role>,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<DataResponse<Vec<User>>>> {
    require_admin(&auth)?;

    let users = state.store.list_users().await?;
    Ok(list(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<User>>> {
    require_self_or_admin(&auth, id)?;

    let user = state.store.find_user(id).await?.ok_or_else(user_not_found)?;
    Ok(data(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<DataResponse<User>>> {
    require_self_or_admin(&auth, id)?;
    if req.role.is_some() && !auth.is_admin() {
        return Err(AuthzError::AdminRequired.into());
    }

    req.name = req.name.map(|n| n.trim().to_string());
    req.email = req.email.map(|e| normalize_email(&e));

    let mut errors = match req.validate() {
        Ok(()) => Vec::new(),
        Err(e) => from_validator(&e),
    };
    if let Some(Err(msg)) = req.password.as_deref().map(password::validate_password_strength) {
        errors.push(FieldError::new("password", msg));
    }
    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let password_hash = match req.password {
        Some(ref plain) => Some(password::hash_password(plain)?),
        None => None,
    };

    let changes = UpdateUser {
        name: req.name,
        email: req.email,
        password_hash,
        role: req.role,
    };

    let user = state
        .store
        .update_user(id, changes)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = %id, updated_by = %auth.user_id, "User updated");
    Ok(data(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    require_admin(&auth)?;

    if !state.store.delete_user(id).await? {
        return Err(user_not_found());
    }

    info!(user_id = %id, deleted_by = %auth.user_id, "User deleted");
    Ok(message("User deleted successfully"))
}
