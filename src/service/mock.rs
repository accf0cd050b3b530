//! In-process mock backend.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{
    DataService, ServiceResult, ADMIN_REQUIRED, DELETE_NOT_SUPPORTED, INVALID_CREDENTIALS,
    NOT_AUTHENTICATED,
};
use crate::crypto::generate_token;
use crate::db::{
    ActivityItem, ApiResponse, DashboardStats, DbPool, LeaveRequest, LoginData, NewLeaveRequest,
    NewUser, PictureFile, ProfileUpdate, ReviewDecision, UploadedPicture, User,
    RECENT_ACTIVITY_LIMIT,
};
use crate::session::SessionStore;
use crate::validation::validate_picture;

pub struct MockDataService {
    db: DbPool,
    session: SessionStore,
}

impl MockDataService {
    pub fn new(db: DbPool, session: SessionStore) -> Self {
        Self { db, session }
    }

    /// The directory record behind the persisted session, if any
    fn current_user(&self) -> Option<User> {
        let session = self.session.load()?;
        self.db.find_user(&session.user.id)
    }

    fn current_admin(&self) -> Result<User, &'static str> {
        match self.current_user() {
            Some(user) if user.is_admin() => Ok(user),
            Some(_) => Err(ADMIN_REQUIRED),
            None => Err(NOT_AUTHENTICATED),
        }
    }

    /// Keep the persisted user in step with the directory
    fn refresh_session(&self, user: &User) {
        if let Some(token) = self.session.token() {
            if let Err(e) = self.session.save(user, &token) {
                warn!(error = %e, "Failed to refresh persisted user");
            }
        }
    }
}

#[async_trait]
impl DataService for MockDataService {
    async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginData> {
        match self.db.authenticate(email, password) {
            Some(user) => {
                info!(user_id = %user.id, "Mock login succeeded");
                Ok(ApiResponse::ok(LoginData {
                    user,
                    token: generate_token(),
                }))
            }
            None => {
                warn!(email, "Mock login rejected");
                Ok(ApiResponse::failure(INVALID_CREDENTIALS))
            }
        }
    }

    async fn logout(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session on logout");
        }
    }

    async fn get_dashboard_stats(&self) -> ServiceResult<DashboardStats> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        Ok(ApiResponse::ok(
            self.db.dashboard_stats(&user.id, Utc::now().date_naive()),
        ))
    }

    async fn get_recent_activity(&self) -> ServiceResult<Vec<ActivityItem>> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        Ok(ApiResponse::ok(
            self.db.recent_activity(&user.id, RECENT_ACTIVITY_LIMIT),
        ))
    }

    async fn get_leave_requests(&self) -> ServiceResult<Vec<LeaveRequest>> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        Ok(ApiResponse::ok(self.db.leaves_for(&user.id)))
    }

    async fn submit_leave_request(&self, request: NewLeaveRequest) -> ServiceResult<LeaveRequest> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        let leave = self.db.submit_leave(&user.id, request);
        debug!(leave_id = %leave.id, "Mock leave request stored");
        Ok(ApiResponse::ok_with_message(
            leave,
            "Leave request submitted successfully",
        ))
    }

    async fn get_user_profile(&self) -> ServiceResult<User> {
        match self.current_user() {
            Some(user) => Ok(ApiResponse::ok(user)),
            None => Ok(ApiResponse::failure(NOT_AUTHENTICATED)),
        }
    }

    async fn update_user_profile(&self, update: ProfileUpdate) -> ServiceResult<User> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        match self.db.update_user(&user.id, &update) {
            Ok(updated) => {
                self.refresh_session(&updated);
                Ok(ApiResponse::ok_with_message(
                    updated,
                    "Profile updated successfully",
                ))
            }
            Err(e) => Ok(ApiResponse::failure(e.to_string())),
        }
    }

    async fn upload_profile_picture(&self, file: PictureFile) -> ServiceResult<UploadedPicture> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        if let Err(message) = validate_picture(&file.content_type, file.bytes.len()) {
            return Ok(ApiResponse::failure(message));
        }

        let asset_id = self.db.store_asset(&file.content_type, file.bytes);
        let url = format!("/api/assets/{}", asset_id);
        let update = ProfileUpdate {
            profile_picture: Some(url.clone()),
            ..Default::default()
        };
        match self.db.update_user(&user.id, &update) {
            Ok(updated) => {
                self.refresh_session(&updated);
                Ok(ApiResponse::ok(UploadedPicture { url }))
            }
            Err(e) => Ok(ApiResponse::failure(e.to_string())),
        }
    }

    async fn change_password(&self, current: &str, new: &str) -> ServiceResult<()> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        match self.db.change_password(&user.id, current, new) {
            Ok(()) => Ok(ApiResponse::ok_with_message((), "Password changed successfully")),
            Err(e) => Ok(ApiResponse::failure(e.to_string())),
        }
    }

    async fn check_in(&self) -> ServiceResult<ActivityItem> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        Ok(match self.db.check_in(&user.id) {
            Ok(item) => ApiResponse::ok(item),
            Err(e) => ApiResponse::failure(e.to_string()),
        })
    }

    async fn check_out(&self) -> ServiceResult<ActivityItem> {
        let Some(user) = self.current_user() else {
            return Ok(ApiResponse::failure(NOT_AUTHENTICATED));
        };
        Ok(match self.db.check_out(&user.id) {
            Ok(item) => ApiResponse::ok(item),
            Err(e) => ApiResponse::failure(e.to_string()),
        })
    }

    async fn list_users(&self) -> ServiceResult<Vec<User>> {
        if let Err(message) = self.current_admin() {
            return Ok(ApiResponse::failure(message));
        }
        Ok(ApiResponse::ok(self.db.list_users()))
    }

    async fn create_user(&self, user: NewUser) -> ServiceResult<User> {
        if let Err(message) = self.current_admin() {
            return Ok(ApiResponse::failure(message));
        }
        Ok(match self.db.create_user(user, Utc::now().date_naive()) {
            Ok(created) => ApiResponse::ok_with_message(created, "User created successfully"),
            Err(e) => ApiResponse::failure(e.to_string()),
        })
    }

    async fn delete_user(&self, id: &str) -> ServiceResult<()> {
        if let Err(message) = self.current_admin() {
            return Ok(ApiResponse::failure(message));
        }
        debug!(user_id = id, "Ignoring delete request");
        Ok(ApiResponse::failure(DELETE_NOT_SUPPORTED))
    }

    async fn get_all_leave_requests(&self) -> ServiceResult<Vec<LeaveRequest>> {
        if let Err(message) = self.current_admin() {
            return Ok(ApiResponse::failure(message));
        }
        Ok(ApiResponse::ok(self.db.all_leaves()))
    }

    async fn review_leave_request(
        &self,
        id: &str,
        decision: ReviewDecision,
    ) -> ServiceResult<LeaveRequest> {
        let admin = match self.current_admin() {
            Ok(admin) => admin,
            Err(message) => return Ok(ApiResponse::failure(message)),
        };
        Ok(match self.db.review_leave(id, &admin.id, decision) {
            Ok(leave) => ApiResponse::ok(leave),
            Err(e) => ApiResponse::failure(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, LeaveStatus, LeaveType, Role, DEMO_ACCOUNTS};
    use bytes::Bytes;
    use chrono::NaiveDate;

    fn service() -> (MockDataService, SessionStore) {
        let store = SessionStore::in_memory();
        let db = db::init(true).unwrap();
        (MockDataService::new(db, store.clone()), store)
    }

    async fn sign_in(service: &MockDataService, store: &SessionStore, email: &str, password: &str) {
        let data = service.login(email, password).await.unwrap().into_data().unwrap();
        store.save(&data.user, &data.token).unwrap();
    }

    #[tokio::test]
    async fn test_login_with_seeded_accounts() {
        let (service, store) = service();
        for account in DEMO_ACCOUNTS {
            let response = service.login(account.email, account.password).await.unwrap();
            assert!(response.success);
            let data = response.data.unwrap();
            assert_eq!(data.user.email, account.email);
            assert!(!data.token.is_empty());
            let json = serde_json::to_value(&data.user).unwrap();
            assert!(json.get("password").is_none());
        }
        // Login alone does not persist anything
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_bad_credentials_leave_session_untouched() {
        let (service, store) = service();
        sign_in(&service, &store, "user@mlvisiotrack.com", "user123").await;
        let before = store.load().unwrap();

        let response = service
            .login("user@mlvisiotrack.com", "wrong-password")
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("Invalid email or password"));
        assert_eq!(store.load().unwrap(), before);
    }

    #[tokio::test]
    async fn test_logout_twice_is_harmless() {
        let (service, store) = service();
        sign_in(&service, &store, "user@mlvisiotrack.com", "user123").await;
        service.logout().await;
        assert!(store.load().is_none());
        service.logout().await;
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_user_operations_need_a_session() {
        let (service, _store) = service();
        let response = service.get_dashboard_stats().await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some(NOT_AUTHENTICATED));
    }

    #[tokio::test]
    async fn test_submit_leave_request() {
        let (service, store) = service();
        sign_in(&service, &store, "user@mlvisiotrack.com", "user123").await;

        let start = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let leave = service
            .submit_leave_request(NewLeaveRequest {
                leave_type: LeaveType::Vacation,
                start_date: start,
                end_date: end,
                reason: "Family trip".to_string(),
            })
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);
        assert_eq!(leave.user_id, "2");

        let leaves = service.get_leave_requests().await.unwrap().into_data().unwrap();
        assert_eq!(leaves[0].id, leave.id);
        assert!(leaves.iter().all(|l| l.user_id == "2"));
    }

    #[tokio::test]
    async fn test_profile_update_is_persisted_to_session() {
        let (service, store) = service();
        sign_in(&service, &store, "user@mlvisiotrack.com", "user123").await;

        let updated = service
            .update_user_profile(ProfileUpdate {
                department: Some("Research".to_string()),
                bio: Some("Likes graphs".to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(updated.department, "Research");
        assert_eq!(updated.name, "John Doe");

        let session = store.load().unwrap();
        assert_eq!(session.user.department, "Research");
        assert_eq!(
            service.get_user_profile().await.unwrap().into_data().unwrap(),
            updated
        );
    }

    #[tokio::test]
    async fn test_upload_profile_picture() {
        let (service, store) = service();
        sign_in(&service, &store, "user@mlvisiotrack.com", "user123").await;

        let rejected = service
            .upload_profile_picture(PictureFile {
                file_name: "cv.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: Bytes::from_static(b"%PDF"),
            })
            .await
            .unwrap();
        assert!(!rejected.success);

        let uploaded = service
            .upload_profile_picture(PictureFile {
                file_name: "me.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: Bytes::from_static(b"\x89PNG\r\n"),
            })
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert!(uploaded.url.starts_with("/api/assets/"));
        assert_eq!(
            store.load().unwrap().user.profile_picture.as_deref(),
            Some(uploaded.url.as_str())
        );
    }

    #[tokio::test]
    async fn test_check_in_then_check_out() {
        let (service, store) = service();
        sign_in(&service, &store, "jane.smith@mlvisiotrack.com", "student123").await;

        assert!(!service.check_out().await.unwrap().success);
        assert!(service.check_in().await.unwrap().success);
        assert!(!service.check_in().await.unwrap().success);
        assert!(service.check_out().await.unwrap().success);

        let stats = service.get_dashboard_stats().await.unwrap().into_data().unwrap();
        assert_eq!(stats.present, 1);

        let activity = service.get_recent_activity().await.unwrap().into_data().unwrap();
        assert_eq!(activity[0].details, "Checked out");
    }

    #[tokio::test]
    async fn test_admin_operations_require_admin() {
        let (service, store) = service();
        sign_in(&service, &store, "user@mlvisiotrack.com", "user123").await;
        let response = service.list_users().await.unwrap();
        assert_eq!(response.message.as_deref(), Some(ADMIN_REQUIRED));

        service.logout().await;
        sign_in(&service, &store, "admin@mlvisiotrack.com", "admin123").await;
        assert_eq!(store.load().unwrap().role, Role::Admin);
        let users = service.list_users().await.unwrap().into_data().unwrap();
        assert_eq!(users.len(), DEMO_ACCOUNTS.len());

        let delete = service.delete_user("2").await.unwrap();
        assert!(!delete.success);
        assert_eq!(delete.message.as_deref(), Some(DELETE_NOT_SUPPORTED));
    }

    #[tokio::test]
    async fn test_admin_reviews_pending_leave() {
        let (service, store) = service();
        sign_in(&service, &store, "admin@mlvisiotrack.com", "admin123").await;

        let pending = service
            .get_all_leave_requests()
            .await
            .unwrap()
            .into_data()
            .unwrap()
            .into_iter()
            .find(|l| l.status == LeaveStatus::Pending)
            .unwrap();

        let reviewed = service
            .review_leave_request(&pending.id, ReviewDecision::Reject)
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(reviewed.status, LeaveStatus::Rejected);

        let again = service
            .review_leave_request(&pending.id, ReviewDecision::Approve)
            .await
            .unwrap();
        assert!(!again.success);
    }
}
