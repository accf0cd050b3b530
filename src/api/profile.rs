//! Profile endpoints and profile picture assets.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

use super::auth::CurrentUser;
use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{ApiResponse, ChangePasswordRequest, ProfileUpdate, UploadedPicture, User};
use crate::validation::{validate_name, validate_password, validate_picture};
use crate::AppState;

const PICTURE_FIELD: &str = "profilePicture";

/// GET /api/profile
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<ApiResponse<User>> {
    Json(ApiResponse::ok(user))
}

/// POST /api/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = &update.name {
        errors.check("name", validate_name(name));
    }
    if let Some(department) = &update.department {
        if department.trim().is_empty() {
            errors.add("department", "Department is required");
        }
    }
    errors.finish()?;

    if update.is_empty() {
        return Ok(Json(ApiResponse::ok(user)));
    }

    let updated = state.db.update_user(&user.id, &update)?;
    info!(user_id = %user.id, "Profile updated");
    Ok(Json(ApiResponse::ok_with_message(
        updated,
        "Profile updated successfully",
    )))
}

/// POST /api/profile/upload
///
/// Multipart form with a single `profilePicture` file part. The content type
/// falls back to a guess from the file name when the part carries none.
pub async fn upload_picture(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedPicture>>, ApiError> {
    let mut picture: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(PICTURE_FIELD) {
            debug!(field = ?field.name(), "Skipping unexpected multipart field");
            continue;
        }
        let content_type = match field.content_type() {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(field.file_name().unwrap_or_default())
                .first_or_octet_stream()
                .to_string(),
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        picture = Some((content_type, bytes));
    }

    let (content_type, bytes) = picture
        .ok_or_else(|| ApiError::validation_field(PICTURE_FIELD, "No file uploaded"))?;
    validate_picture(&content_type, bytes.len())
        .map_err(|e| ApiError::validation_field(PICTURE_FIELD, e))?;

    let size = bytes.len();
    let asset_id = state.db.store_asset(&content_type, bytes);
    let url = format!("/api/assets/{}", asset_id);
    state.db.update_user(
        &user.id,
        &ProfileUpdate {
            profile_picture: Some(url.clone()),
            ..Default::default()
        },
    )?;
    info!(user_id = %user.id, asset_id = %asset_id, size, "Profile picture uploaded");

    Ok(Json(ApiResponse::ok(UploadedPicture { url })))
}

/// POST /api/profile/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    validate_password(&request.new_password)
        .map_err(|e| ApiError::validation_field("newPassword", e))?;

    state
        .db
        .change_password(&user.id, &request.current_password, &request.new_password)?;
    info!(user_id = %user.id, "Password changed");

    Ok(Json(ApiResponse::ok_with_message(
        (),
        "Password changed successfully",
    )))
}

/// GET /api/assets/:id
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let asset = state
        .db
        .asset(&id)
        .ok_or_else(|| ApiError::not_found("Asset not found"))?;
    Ok(([(header::CONTENT_TYPE, asset.content_type)], asset.bytes).into_response())
}
