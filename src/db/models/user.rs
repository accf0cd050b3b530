//! User, credential and profile models.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Landing page for this role
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::User => "/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    Super,
    Regular,
}

impl FromStr for AdminLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super" => Ok(AdminLevel::Super),
            "regular" => Ok(AdminLevel::Regular),
            _ => Err(format!("Invalid admin level: {}", s)),
        }
    }
}

/// Public user record. Never carries a password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    pub join_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<AdminLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Directory entry: the public user plus its password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub user: User,
    pub token: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.department.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(department) = &self.department {
            user.department = department.trim().to_string();
        }
        if let Some(bio) = &self.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(picture) = &self.profile_picture {
            user.profile_picture = Some(picture.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Admin-side "create user" form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_level: Option<AdminLevel>,
}

/// A picture file on its way to `uploadProfilePicture`.
#[derive(Debug, Clone)]
pub struct PictureFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedPicture {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "2".to_string(),
            name: "John Doe".to_string(),
            email: "user@mlvisiotrack.com".to_string(),
            role: Role::User,
            department: "Engineering".to_string(),
            profile_picture: None,
            join_date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            registration_number: None,
            admin_level: None,
            bio: None,
        }
    }

    #[test]
    fn test_user_wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(json["joinDate"], "2023-03-01");
        assert_eq!(json["role"], "user");
        assert!(json["profilePicture"].is_null());
        assert!(json.get("password").is_none());
        assert!(json.get("adminLevel").is_none());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let mut json = serde_json::to_value(sample_user()).unwrap();
        json["role"] = serde_json::Value::String("superuser".to_string());
        assert!(serde_json::from_value::<User>(json).is_err());
    }

    #[test]
    fn test_role_home_paths() {
        assert_eq!(Role::Admin.home_path(), "/admin/dashboard");
        assert_eq!(Role::User.home_path(), "/dashboard");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_profile_update_only_touches_present_fields() {
        let mut user = sample_user();
        let update = ProfileUpdate {
            name: Some("  Johnny Doe ".to_string()),
            bio: Some("Backend engineer".to_string()),
            ..Default::default()
        };
        update.apply(&mut user);
        assert_eq!(user.name, "Johnny Doe");
        assert_eq!(user.department, "Engineering");
        assert_eq!(user.bio.as_deref(), Some("Backend engineer"));
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}
