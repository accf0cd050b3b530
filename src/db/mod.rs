//! In-memory backing store for the mock backend.
//!
//! Holds the account directory, leave requests, the activity feed, uploaded
//! profile pictures and server-side token sessions. Every table sits behind
//! its own lock; no operation holds more than one write lock at a time.

mod models;
mod seeders;

pub use models::*;
pub use seeders::{seed_demo_data, SeedAccount, DEMO_ACCOUNTS};

use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::crypto::{generate_token, hash_password, hash_token, verify_password};

pub type DbPool = Arc<MemoryDb>;

/// Most recent activity items returned to a dashboard
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("A user with this email already exists")]
    DuplicateEmail,
    #[error("User not found")]
    UserNotFound,
    #[error("Leave request not found")]
    LeaveNotFound,
    #[error("Leave request has already been reviewed")]
    AlreadyReviewed,
    #[error("Current password is incorrect")]
    InvalidPassword,
    #[error("You are already checked in")]
    AlreadyCheckedIn,
    #[error("You are not checked in")]
    NotCheckedIn,
    #[error("Failed to hash password: {0}")]
    Hash(String),
}

/// Server-side record behind a bearer token
#[derive(Debug, Clone)]
pub struct TokenSession {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct MemoryDb {
    users: RwLock<Vec<UserRecord>>,
    leaves: RwLock<Vec<LeaveRequest>>,
    activity: RwLock<Vec<ActivityItem>>,
    assets: DashMap<String, StoredAsset>,
    /// Keyed by the SHA-256 of the bearer token
    sessions: DashMap<String, TokenSession>,
}

pub fn init(seed_demo: bool) -> Result<DbPool> {
    let db = MemoryDb::default();
    if seed_demo {
        seed_demo_data(&db)?;
    }
    info!("In-memory store initialized");
    Ok(Arc::new(db))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl MemoryDb {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    pub(crate) fn insert_record(&self, record: UserRecord) {
        self.users.write().push(record);
    }

    pub fn find_user(&self, id: &str) -> Option<User> {
        self.users
            .read()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.users
            .read()
            .iter()
            .find(|r| normalize_email(&r.user.email) == email)
            .map(|r| r.user.clone())
    }

    pub fn list_users(&self) -> Vec<User> {
        self.users.read().iter().map(|r| r.user.clone()).collect()
    }

    /// Check credentials against the directory. The returned user carries no password.
    pub fn authenticate(&self, email: &str, password: &str) -> Option<User> {
        let email = normalize_email(email);
        let record = self
            .users
            .read()
            .iter()
            .find(|r| normalize_email(&r.user.email) == email)
            .cloned()?;

        if verify_password(password, &record.password_hash) {
            Some(record.user)
        } else {
            None
        }
    }

    pub fn create_user(&self, new_user: NewUser, join_date: NaiveDate) -> Result<User, DbError> {
        if self.find_user_by_email(&new_user.email).is_some() {
            return Err(DbError::DuplicateEmail);
        }

        let password_hash =
            hash_password(&new_user.password).map_err(|e| DbError::Hash(e.to_string()))?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: new_user.name.trim().to_string(),
            email: new_user.email.trim().to_string(),
            role: new_user.role,
            department: new_user.department.trim().to_string(),
            profile_picture: None,
            join_date,
            registration_number: new_user.registration_number,
            admin_level: match new_user.role {
                Role::Admin => new_user.admin_level.or(Some(AdminLevel::Regular)),
                Role::User => None,
            },
            bio: None,
        };

        let mut users = self.users.write();
        // Re-check under the write lock so two concurrent creates cannot both win.
        if users
            .iter()
            .any(|r| normalize_email(&r.user.email) == normalize_email(&user.email))
        {
            return Err(DbError::DuplicateEmail);
        }
        users.push(UserRecord {
            user: user.clone(),
            password_hash,
        });

        info!(user_id = %user.id, role = %user.role, "Created user");
        Ok(user)
    }

    pub fn update_user(&self, id: &str, update: &ProfileUpdate) -> Result<User, DbError> {
        let mut users = self.users.write();
        let record = users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(DbError::UserNotFound)?;
        update.apply(&mut record.user);
        Ok(record.user.clone())
    }

    pub fn change_password(&self, id: &str, current: &str, new: &str) -> Result<(), DbError> {
        // Hash up front so the write guard is not held across argon2.
        let new_hash = hash_password(new).map_err(|e| DbError::Hash(e.to_string()))?;

        let mut users = self.users.write();
        let record = users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(DbError::UserNotFound)?;
        if !verify_password(current, &record.password_hash) {
            return Err(DbError::InvalidPassword);
        }
        record.password_hash = new_hash;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Leave requests
    // -------------------------------------------------------------------------

    pub(crate) fn insert_leave(&self, leave: LeaveRequest) {
        self.leaves.write().push(leave);
    }

    /// Record a new pending request for `user_id` and log it to the activity feed.
    pub fn submit_leave(&self, user_id: &str, request: NewLeaveRequest) -> LeaveRequest {
        let leave = LeaveRequest {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
            status: LeaveStatus::Pending,
            created_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
        };
        self.insert_leave(leave.clone());
        self.record_activity(ActivityItem::new(
            user_id,
            ActivityType::LeaveRequest,
            format!(
                "Submitted {} leave for {} to {}",
                leave.leave_type, leave.start_date, leave.end_date
            ),
        ));
        leave
    }

    /// Requests owned by one user, newest first
    pub fn leaves_for(&self, user_id: &str) -> Vec<LeaveRequest> {
        let mut leaves: Vec<LeaveRequest> = self
            .leaves
            .read()
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        leaves
    }

    pub fn all_leaves(&self) -> Vec<LeaveRequest> {
        let mut leaves = self.leaves.read().clone();
        leaves.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        leaves
    }

    /// Apply an admin decision. Only pending requests can be reviewed.
    pub fn review_leave(
        &self,
        id: &str,
        reviewer_id: &str,
        decision: ReviewDecision,
    ) -> Result<LeaveRequest, DbError> {
        let reviewed = {
            let mut leaves = self.leaves.write();
            let leave = leaves
                .iter_mut()
                .find(|l| l.id == id)
                .ok_or(DbError::LeaveNotFound)?;
            if leave.status != LeaveStatus::Pending {
                return Err(DbError::AlreadyReviewed);
            }
            leave.status = decision.status();
            leave.reviewed_by = Some(reviewer_id.to_string());
            leave.reviewed_at = Some(Utc::now());
            leave.clone()
        };

        let (activity_type, verb) = match decision {
            ReviewDecision::Approve => (ActivityType::LeaveApproved, "approved"),
            ReviewDecision::Reject => (ActivityType::LeaveRejected, "rejected"),
        };
        self.record_activity(ActivityItem::new(
            &reviewed.user_id,
            activity_type,
            format!(
                "{} leave for {} to {} {}",
                capitalize(reviewed.leave_type.as_str()),
                reviewed.start_date,
                reviewed.end_date,
                verb
            ),
        ));

        info!(leave_id = %id, reviewer_id, status = %reviewed.status, "Reviewed leave request");
        Ok(reviewed)
    }

    // -------------------------------------------------------------------------
    // Activity
    // -------------------------------------------------------------------------

    pub fn record_activity(&self, item: ActivityItem) {
        self.activity.write().push(item);
    }

    pub fn activity_for(&self, user_id: &str) -> Vec<ActivityItem> {
        self.activity
            .read()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Newest first, capped at `limit`
    pub fn recent_activity(&self, user_id: &str, limit: usize) -> Vec<ActivityItem> {
        let mut items = self.activity_for(user_id);
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(limit);
        items
    }

    /// Latest check-in/out in `activity` decides whether the user is on site
    fn is_checked_in(activity: &[ActivityItem], user_id: &str) -> bool {
        activity
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| matches!(a.activity_type, ActivityType::CheckIn | ActivityType::CheckOut))
            .max_by_key(|a| a.timestamp)
            .map(|a| a.activity_type == ActivityType::CheckIn)
            .unwrap_or(false)
    }

    pub fn check_in(&self, user_id: &str) -> Result<ActivityItem, DbError> {
        // State check and append share one write guard.
        let mut activity = self.activity.write();
        if Self::is_checked_in(&activity, user_id) {
            return Err(DbError::AlreadyCheckedIn);
        }
        let item = ActivityItem::new(user_id, ActivityType::CheckIn, "Checked in");
        activity.push(item.clone());
        Ok(item)
    }

    pub fn check_out(&self, user_id: &str) -> Result<ActivityItem, DbError> {
        let mut activity = self.activity.write();
        if !Self::is_checked_in(&activity, user_id) {
            return Err(DbError::NotCheckedIn);
        }
        let item = ActivityItem::new(user_id, ActivityType::CheckOut, "Checked out");
        activity.push(item.clone());
        Ok(item)
    }

    pub fn dashboard_stats(&self, user_id: &str, today: NaiveDate) -> DashboardStats {
        DashboardStats::project(&self.activity_for(user_id), &self.leaves_for(user_id), today)
    }

    // -------------------------------------------------------------------------
    // Assets
    // -------------------------------------------------------------------------

    /// Store an uploaded file and return its id
    pub fn store_asset(&self, content_type: &str, bytes: Bytes) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.assets.insert(
            id.clone(),
            StoredAsset {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        id
    }

    pub fn asset(&self, id: &str) -> Option<StoredAsset> {
        self.assets.get(id).map(|a| a.value().clone())
    }

    // -------------------------------------------------------------------------
    // Token sessions
    // -------------------------------------------------------------------------

    /// Open a session for `user_id` and return the plaintext token
    pub fn create_session(&self, user_id: &str, ttl: Duration) -> String {
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            TokenSession {
                user_id: user_id.to_string(),
                expires_at: Utc::now() + ttl,
            },
        );
        token
    }

    /// Resolve a bearer token to its user, dropping the session if it expired
    pub fn resolve_token(&self, token: &str) -> Option<User> {
        let key = hash_token(token);
        let session = self.sessions.get(&key).map(|s| s.value().clone())?;
        if session.expires_at <= Utc::now() {
            self.sessions.remove(&key);
            return None;
        }
        self.find_user(&session.user_id)
    }

    pub fn revoke_token(&self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn purge_expired_sessions(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        before - self.sessions.len()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
