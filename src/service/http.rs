//! HTTP backend adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use super::{DataService, ServiceError, ServiceResult};
use crate::db::{
    ActivityItem, ApiResponse, ChangePasswordRequest, DashboardStats, LeaveRequest, LoginData,
    LoginRequest, NewLeaveRequest, NewUser, PictureFile, ProfileUpdate, ReviewDecision,
    ReviewRequest, UploadedPicture, User,
};
use crate::session::SessionStore;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to a running visiotrack server, authenticating with the token held
/// in the session store.
pub struct HttpDataService {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl HttpDataService {
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Attach the bearer token, send, and read the envelope whatever the
    /// status code. Anything that is not an envelope is unexpected.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<T> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => {
                debug!(status = status.as_u16(), success = envelope.success, "API response");
                Ok(envelope)
            }
            Err(e) => {
                warn!(status = status.as_u16(), error = %e, "Response is not an API envelope");
                Err(ServiceError::UnexpectedResponse {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ServiceResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> ServiceResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginData> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/login", &body).await
    }

    async fn logout(&self) {
        if self.session.token().is_some() {
            let result: ServiceResult<()> = self.post("/logout", &json!({})).await;
            if let Err(e) = result {
                warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session on logout");
        }
    }

    async fn get_dashboard_stats(&self) -> ServiceResult<DashboardStats> {
        self.get("/dashboard").await
    }

    async fn get_recent_activity(&self) -> ServiceResult<Vec<ActivityItem>> {
        self.get("/activity").await
    }

    async fn get_leave_requests(&self) -> ServiceResult<Vec<LeaveRequest>> {
        self.get("/leaves").await
    }

    async fn submit_leave_request(&self, request: NewLeaveRequest) -> ServiceResult<LeaveRequest> {
        self.post("/leave", &request).await
    }

    async fn get_user_profile(&self) -> ServiceResult<User> {
        self.get("/profile").await
    }

    async fn update_user_profile(&self, update: ProfileUpdate) -> ServiceResult<User> {
        let response: ApiResponse<User> = self.post("/profile", &update).await?;
        if let (Some(user), Some(token)) = (&response.data, self.session.token()) {
            if let Err(e) = self.session.save(user, &token) {
                warn!(error = %e, "Failed to refresh persisted user");
            }
        }
        Ok(response)
    }

    async fn upload_profile_picture(&self, file: PictureFile) -> ServiceResult<UploadedPicture> {
        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = multipart::Form::new().part("profilePicture", part);
        let response: ApiResponse<UploadedPicture> = self
            .send(self.client.post(self.url("/profile/upload")).multipart(form))
            .await?;

        if response.success {
            if let Some(session) = self.session.load() {
                let mut user = session.user;
                user.profile_picture = response.data.as_ref().map(|p| p.url.clone());
                if let Err(e) = self.session.save(&user, &session.token) {
                    warn!(error = %e, "Failed to refresh persisted user");
                }
            }
        }
        Ok(response)
    }

    async fn change_password(&self, current: &str, new: &str) -> ServiceResult<()> {
        let body = ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        self.post("/profile/password", &body).await
    }

    async fn check_in(&self) -> ServiceResult<ActivityItem> {
        self.post("/attendance/check-in", &json!({})).await
    }

    async fn check_out(&self) -> ServiceResult<ActivityItem> {
        self.post("/attendance/check-out", &json!({})).await
    }

    async fn list_users(&self) -> ServiceResult<Vec<User>> {
        self.get("/admin/users").await
    }

    async fn create_user(&self, user: NewUser) -> ServiceResult<User> {
        self.post("/admin/users", &user).await
    }

    async fn delete_user(&self, id: &str) -> ServiceResult<()> {
        self.send(self.client.delete(self.url(&format!("/admin/users/{}", id))))
            .await
    }

    async fn get_all_leave_requests(&self) -> ServiceResult<Vec<LeaveRequest>> {
        self.get("/admin/leaves").await
    }

    async fn review_leave_request(
        &self,
        id: &str,
        decision: ReviewDecision,
    ) -> ServiceResult<LeaveRequest> {
        self.post(
            &format!("/admin/leaves/{}/review", id),
            &ReviewRequest { decision },
        )
        .await
    }
}
