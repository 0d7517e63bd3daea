/// Request authentication
///
/// A bearer token only proves who the caller was when it was issued. Every
/// request therefore re-loads the user: a deleted account stops working
/// immediately, and the role used for authorization is the current one.
///
/// # Request Extensions
///
/// After successful authentication an [`AuthContext`] is inserted into the
/// request extensions; handlers take it as an extractor.
///
/// ```no_run
/// use taskdeck_shared::auth::middleware::AuthContext;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("Hello, user {} ({})", auth.user_id, auth.role)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::{Role, User};
use crate::store::{StoreError, UserStore};

/// Authenticated requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(user.id, user.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its user no longer exists
    #[error("User no longer exists")]
    UnknownUser,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    fn status_and_message(&self) -> (StatusCode, &'static str, String) {
        match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Not authorized, no token".to_string(),
            ),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AuthError::UnknownUser => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AuthError::Store(e) => {
                tracing::error!(error = %e, "Store failure during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

/// Same `{error, message}` body as the API's own error responses
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_message();
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Validates an access token and loads the user it names
pub async fn authenticate<S>(store: &S, secret: &str, token: &str) -> Result<AuthContext, AuthError>
where
    S: UserStore + ?Sized,
{
    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    let user = store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext::from_user(&user))
}

/// Extracts the [`AuthContext`] inserted by the authentication layer
///
/// Rejects with 401 when the handler is mounted outside that layer.
#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
