//! Data service port.
//!
//! Views talk to the backend only through `DataService`. Two adapters
//! implement it: `MockDataService` answers from the in-memory store in the
//! same process, `HttpDataService` calls the HTTP server. Both speak the
//! same `ApiResponse` envelope, so swapping one for the other does not touch
//! callers.

mod http;
mod mock;

pub use http::HttpDataService;
pub use mock::MockDataService;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::{
    ActivityItem, ApiResponse, DashboardStats, LeaveRequest, LoginData, NewLeaveRequest, NewUser,
    PictureFile, ProfileUpdate, ReviewDecision, UploadedPicture, User,
};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const NOT_AUTHENTICATED: &str = "Not authenticated";
pub const ADMIN_REQUIRED: &str = "Admin access required";
pub const DELETE_NOT_SUPPORTED: &str = "User deletion is not supported";

/// Failures below the envelope: the request never produced one.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
}

pub type ServiceResult<T> = Result<ApiResponse<T>, ServiceError>;

#[async_trait]
pub trait DataService: Send + Sync {
    /// Check credentials. Never touches the session store.
    async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginData>;

    /// Clear the session store. Never fails.
    async fn logout(&self);

    async fn get_dashboard_stats(&self) -> ServiceResult<DashboardStats>;
    async fn get_recent_activity(&self) -> ServiceResult<Vec<ActivityItem>>;
    async fn get_leave_requests(&self) -> ServiceResult<Vec<LeaveRequest>>;

    /// Store a new request. The caller has already validated the dates.
    async fn submit_leave_request(&self, request: NewLeaveRequest) -> ServiceResult<LeaveRequest>;

    async fn get_user_profile(&self) -> ServiceResult<User>;
    async fn update_user_profile(&self, update: ProfileUpdate) -> ServiceResult<User>;
    async fn upload_profile_picture(&self, file: PictureFile) -> ServiceResult<UploadedPicture>;
    async fn change_password(&self, current: &str, new: &str) -> ServiceResult<()>;

    async fn check_in(&self) -> ServiceResult<ActivityItem>;
    async fn check_out(&self) -> ServiceResult<ActivityItem>;

    async fn list_users(&self) -> ServiceResult<Vec<User>>;
    async fn create_user(&self, user: NewUser) -> ServiceResult<User>;
    async fn delete_user(&self, id: &str) -> ServiceResult<()>;
    async fn get_all_leave_requests(&self) -> ServiceResult<Vec<LeaveRequest>>;
    async fn review_leave_request(
        &self,
        id: &str,
        decision: ReviewDecision,
    ) -> ServiceResult<LeaveRequest>;
}
