mod attendance;
pub mod auth;
pub mod error;
mod leaves;
mod navigation;
mod profile;
mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::validation::MAX_PICTURE_BYTES;
use crate::AppState;

/// Multipart framing on top of the largest accepted picture
const UPLOAD_BODY_LIMIT: usize = MAX_PICTURE_BYTES + 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/validate", get(auth::validate))
        .route("/navigate", get(navigation::navigate))
        .route("/assets/:id", get(profile::get_asset));

    let admin_routes = Router::new()
        .route("/admin/users", get(users::list_users))
        .route("/admin/users", post(users::create_user))
        .route("/admin/users/:id", delete(users::delete_user))
        .route("/admin/leaves", get(leaves::all_leaves))
        .route("/admin/leaves/:id/review", post(leaves::review_leave))
        .route_layer(middleware::from_fn(auth::require_admin));

    // Protected API routes
    let api_routes = Router::new()
        .route("/dashboard", get(attendance::dashboard))
        .route("/activity", get(attendance::recent_activity))
        .route("/attendance/check-in", post(attendance::check_in))
        .route("/attendance/check-out", post(attendance::check_out))
        .route("/leaves", get(leaves::my_leaves))
        .route("/leave", post(leaves::submit_leave))
        .route("/profile", get(profile::get_profile))
        .route("/profile", post(profile::update_profile))
        .route(
            "/profile/upload",
            post(profile::upload_picture).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/profile/password", post(profile::change_password))
        .merge(admin_routes)
        // Protected by auth
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public_routes.merge(api_routes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState::new(Config::default(), db::init(true).unwrap()));
        create_router(state)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": email, "password": password })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_returns_user_without_password() {
        let app = app();
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": "admin@mlvisiotrack.com", "password": "admin123" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["role"], "admin");
        assert!(body["data"]["user"].get("password").is_none());
        assert!(body["data"]["user"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_bad_login_is_401_envelope() {
        let app = app();
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "email": "admin@mlvisiotrack.com", "password": "guess" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_protected_route_needs_token() {
        let app = app();
        let (status, body) = send(&app, request(Method::GET, "/api/dashboard", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");

        let (status, _) = send(
            &app,
            request(Method::GET, "/api/dashboard", Some("not-a-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bearer_token_unlocks_dashboard() {
        let app = app();
        let token = login(&app, "user@mlvisiotrack.com", "user123").await;
        let (status, body) = send(
            &app,
            request(Method::GET, "/api/dashboard", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["totalHours"].is_number());

        let (status, body) =
            send(&app, request(Method::GET, "/api/validate", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "user@mlvisiotrack.com");
    }

    #[tokio::test]
    async fn test_user_token_on_admin_route_is_403() {
        let app = app();
        let token = login(&app, "user@mlvisiotrack.com", "user123").await;
        let (status, body) = send(
            &app,
            request(Method::GET, "/api/admin/users", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Admin access required");
    }

    #[tokio::test]
    async fn test_invalid_leave_dates_are_400() {
        let app = app();
        let token = login(&app, "jane.smith@mlvisiotrack.com", "student123").await;
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/leave",
                Some(&token),
                Some(json!({
                    "type": "sick",
                    "startDate": "2024-03-20",
                    "endDate": "2024-03-15",
                    "reason": "Flu"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
        assert_eq!(body["errors"]["endDate"][0], "End date cannot be before start date");
    }

    #[tokio::test]
    async fn test_submit_then_review_leave() {
        let app = app();
        let user = login(&app, "user@mlvisiotrack.com", "user123").await;
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/leave",
                Some(&user),
                Some(json!({
                    "type": "vacation",
                    "startDate": "2024-07-01",
                    "endDate": "2024-07-05",
                    "reason": "Summer break"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "pending");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let admin = login(&app, "admin@mlvisiotrack.com", "admin123").await;
        let uri = format!("/api/admin/leaves/{}/review", id);
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                &uri,
                Some(&admin),
                Some(json!({ "decision": "approve" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "approved");

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                &uri,
                Some(&admin),
                Some(json!({ "decision": "reject" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_check_in_twice_conflicts() {
        let app = app();
        let token = login(&app, "user@mlvisiotrack.com", "user123").await;
        let (status, body) = send(
            &app,
            request(Method::POST, "/api/attendance/check-in", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["type"], "check-in");

        let (status, _) = send(
            &app,
            request(Method::POST, "/api/attendance/check-in", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_wrong_current_password_is_rejected() {
        let app = app();
        let token = login(&app, "user@mlvisiotrack.com", "user123").await;
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/profile/password",
                Some(&token),
                Some(json!({ "currentPassword": "nope", "newPassword": "longenough" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Current password is incorrect");
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = app();
        let token = login(&app, "user@mlvisiotrack.com", "user123").await;
        let (status, _) = send(&app, request(Method::POST, "/api/logout", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, request(Method::GET, "/api/profile", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Second logout is still a success
        let (status, body) =
            send(&app, request(Method::POST, "/api/logout", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_navigate_applies_guard() {
        let app = app();
        let (_, body) = send(
            &app,
            request(Method::GET, "/api/navigate?path=/admin/users", None, None),
        )
        .await;
        assert_eq!(body["data"]["decision"], "REDIRECT_TO_LOGIN");
        assert_eq!(body["data"]["redirectTo"], "/login");

        let token = login(&app, "admin@mlvisiotrack.com", "admin123").await;
        let (_, body) = send(
            &app,
            request(Method::GET, "/api/navigate?path=/dashboard", Some(&token), None),
        )
        .await;
        assert_eq!(body["data"]["redirectTo"], "/admin/dashboard");
    }

    #[tokio::test]
    async fn test_delete_user_is_not_supported() {
        let app = app();
        let admin = login(&app, "admin@mlvisiotrack.com", "admin123").await;
        let (status, body) = send(
            &app,
            request(Method::DELETE, "/api/admin/users/2", Some(&admin), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            request(Method::DELETE, "/api/admin/users/nobody", Some(&admin), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_user_validates_fields() {
        let app = app();
        let admin = login(&app, "admin@mlvisiotrack.com", "admin123").await;
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/users",
                Some(&admin),
                Some(json!({
                    "name": "",
                    "email": "not-an-email",
                    "password": "secret1",
                    "role": "user",
                    "department": "Physics"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"]["name"].is_array());
        assert!(body["errors"]["email"].is_array());

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/users",
                Some(&admin),
                Some(json!({
                    "name": "Ada Lovelace",
                    "email": "ada@mlvisiotrack.com",
                    "password": "secret1",
                    "role": "user",
                    "department": "Physics"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["email"], "ada@mlvisiotrack.com");
    }
}
