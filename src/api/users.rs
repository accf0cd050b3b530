use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::auth::CurrentUser;
use super::error::{ApiError, ErrorCode, ValidationErrorBuilder};
use crate::db::{ApiResponse, NewUser, User};
use crate::service::DELETE_NOT_SUPPORTED;
use crate::validation::{
    validate_email, validate_name, validate_password, validate_registration_number,
};
use crate::AppState;

/// GET /api/admin/users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<User>>> {
    Json(ApiResponse::ok(state.db.list_users()))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_name(&request.name))
        .check("email", validate_email(&request.email))
        .check("password", validate_password(&request.password))
        .check(
            "registrationNumber",
            validate_registration_number(&request.registration_number),
        );
    if request.department.trim().is_empty() {
        errors.add("department", "Department is required");
    }
    errors.finish()?;

    let user = state.db.create_user(request, Utc::now().date_naive())?;
    info!(user_id = %user.id, created_by = %admin.id, "User created via API");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(user, "User created successfully")),
    ))
}

/// DELETE /api/admin/users/:id
///
/// Accounts cannot be removed yet; known ids get 501, unknown ids 404.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    if state.db.find_user(&id).is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    warn!(user_id = %id, "User deletion requested but not supported");
    Err(ApiError::new(ErrorCode::NotImplemented, DELETE_NOT_SUPPORTED))
}
