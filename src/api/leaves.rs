use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::CurrentUser;
use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{ApiResponse, LeaveRequest, NewLeaveRequest, ReviewRequest};
use crate::validation::leave_request_errors;
use crate::AppState;

/// GET /api/leaves
pub async fn my_leaves(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<Vec<LeaveRequest>>> {
    Json(ApiResponse::ok(state.db.leaves_for(&user.id)))
}

/// POST /api/leave
pub async fn submit_leave(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<NewLeaveRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LeaveRequest>>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    for (field, message) in leave_request_errors(&request) {
        errors.add(field, message);
    }
    errors.finish()?;

    let leave = state.db.submit_leave(&user.id, request);
    info!(leave_id = %leave.id, user_id = %user.id, "Leave request submitted");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            leave,
            "Leave request submitted successfully",
        )),
    ))
}

/// GET /api/admin/leaves
pub async fn all_leaves(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<LeaveRequest>>> {
    Json(ApiResponse::ok(state.db.all_leaves()))
}

/// POST /api/admin/leaves/:id/review
pub async fn review_leave(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<LeaveRequest>>, ApiError> {
    let leave = state.db.review_leave(&id, &admin.id, request.decision)?;
    Ok(Json(ApiResponse::ok(leave)))
}
