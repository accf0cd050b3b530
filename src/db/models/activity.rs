//! Append-only activity feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityType {
    CheckIn,
    CheckOut,
    LeaveRequest,
    LeaveApproved,
    LeaveRejected,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::CheckIn => "check-in",
            ActivityType::CheckOut => "check-out",
            ActivityType::LeaveRequest => "leave-request",
            ActivityType::LeaveApproved => "leave-approved",
            ActivityType::LeaveRejected => "leave-rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

impl ActivityItem {
    pub fn new(user_id: &str, activity_type: ActivityType, details: impl Into<String>) -> Self {
        Self::at(user_id, activity_type, Utc::now(), details)
    }

    pub fn at(
        user_id: &str,
        activity_type: ActivityType,
        timestamp: DateTime<Utc>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            activity_type,
            timestamp,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_wire_names() {
        let item = ActivityItem::new("2", ActivityType::LeaveApproved, "Vacation approved");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "leave-approved");
        assert_eq!(json["userId"], "2");
        assert_eq!(ActivityType::CheckIn.as_str(), "check-in");
    }
}
