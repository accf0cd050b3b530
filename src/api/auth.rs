use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use crate::db::{ApiResponse, LoginData, LoginRequest, User};
use crate::service::{ADMIN_REQUIRED, INVALID_CREDENTIALS, NOT_AUTHENTICATED};
use crate::AppState;

/// The user behind the bearer token, placed in request extensions by
/// `auth_middleware`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract the token from request headers
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, ApiError> {
    let user = match state.db.authenticate(&request.email, &request.password) {
        Some(user) => user,
        None => {
            warn!(email = %request.email, "Rejected login");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let token = state
        .db
        .create_session(&user.id, state.config.auth.session_ttl());
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(ApiResponse::ok(LoginData { user, token })))
}

/// Revoke the presented token. Succeeds whether or not it was valid.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<ApiResponse<()>> {
    if let Some(token) = extract_token(&headers) {
        if state.db.revoke_token(&token) {
            info!("Session revoked");
        }
    }
    Json(ApiResponse::ok_with_message((), "Logged out"))
}

/// Validate token endpoint
pub async fn validate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = extract_token(&headers)
        .and_then(|token| state.db.resolve_token(&token))
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;
    Ok(Json(ApiResponse::ok(user)))
}

/// Auth middleware that validates tokens
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;

    let user = state
        .db
        .resolve_token(&token)
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Admin gate, layered inside `auth_middleware`
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin() => Ok(next.run(request).await),
        Some(CurrentUser(user)) => {
            warn!(user_id = %user.id, path = %request.uri().path(), "Admin route refused");
            Err(ApiError::forbidden(ADMIN_REQUIRED))
        }
        None => Err(ApiError::unauthorized(NOT_AUTHENTICATED)),
    }
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))
    }
}
