//! Dashboard, activity feed and check-in/check-out.

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::auth::CurrentUser;
use super::error::ApiError;
use crate::db::{ActivityItem, ApiResponse, DashboardStats, RECENT_ACTIVITY_LIMIT};
use crate::AppState;

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<DashboardStats>> {
    let stats = state.db.dashboard_stats(&user.id, Utc::now().date_naive());
    Json(ApiResponse::ok(stats))
}

/// GET /api/activity
pub async fn recent_activity(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<Vec<ActivityItem>>> {
    Json(ApiResponse::ok(
        state.db.recent_activity(&user.id, RECENT_ACTIVITY_LIMIT),
    ))
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ActivityItem>>, ApiError> {
    let item = state.db.check_in(&user.id)?;
    info!(user_id = %user.id, "Checked in");
    Ok(Json(ApiResponse::ok(item)))
}

pub async fn check_out(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<ActivityItem>>, ApiError> {
    let item = state.db.check_out(&user.id)?;
    info!(user_id = %user.id, "Checked out");
    Ok(Json(ApiResponse::ok(item)))
}
