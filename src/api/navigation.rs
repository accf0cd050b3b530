//! Route guard exposed over HTTP, for thin clients that do not embed it.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::extract_token;
use crate::auth::{AuthState, Navigation};
use crate::db::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NavigateQuery {
    #[serde(default)]
    pub path: String,
}

/// GET /api/navigate?path=/admin/users
///
/// The bearer token is optional; without a valid one the visitor is treated
/// as signed out.
pub async fn navigate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<NavigateQuery>,
) -> Json<ApiResponse<Navigation>> {
    let user = extract_token(&headers).and_then(|token| state.db.resolve_token(&token));
    let auth = AuthState::resolved(user);
    Json(ApiResponse::ok(state.routes.navigate(&query.path, &auth, None)))
}
