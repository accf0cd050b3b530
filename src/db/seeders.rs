//! Seeders for the built-in demo directory
//!
//! The mock backend answers logins against a fixed set of accounts. The same
//! seed also provides a little activity and a few leave requests so the
//! dashboards have something to show on first start.

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use lazy_static::lazy_static;
use tracing::info;

use super::{
    ActivityItem, ActivityType, AdminLevel, LeaveRequest, LeaveStatus, LeaveType, MemoryDb, Role,
    User, UserRecord,
};
use crate::crypto::hash_password;

/// A seeded account with its plaintext password
#[derive(Debug, Clone, Copy)]
pub struct SeedAccount {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
    pub department: &'static str,
    pub join_date: (i32, u32, u32),
    pub registration_number: Option<&'static str>,
    pub admin_level: Option<AdminLevel>,
}

pub const DEMO_ACCOUNTS: &[SeedAccount] = &[
    SeedAccount {
        id: "1",
        name: "Admin User",
        email: "admin@mlvisiotrack.com",
        password: "admin123",
        role: Role::Admin,
        department: "Administration",
        join_date: (2022, 1, 10),
        registration_number: None,
        admin_level: Some(AdminLevel::Super),
    },
    SeedAccount {
        id: "2",
        name: "John Doe",
        email: "user@mlvisiotrack.com",
        password: "user123",
        role: Role::User,
        department: "Engineering",
        join_date: (2023, 3, 1),
        registration_number: None,
        admin_level: None,
    },
    SeedAccount {
        id: "3",
        name: "Jane Smith",
        email: "jane.smith@mlvisiotrack.com",
        password: "student123",
        role: Role::User,
        department: "Computer Science",
        join_date: (2024, 1, 15),
        registration_number: Some("MLV-2024-0042"),
        admin_level: None,
    },
];

lazy_static! {
    /// Argon2 is deliberately slow; hash the demo passwords once per process.
    static ref DEMO_PASSWORD_HASHES: Result<Vec<String>, String> = DEMO_ACCOUNTS
        .iter()
        .map(|account| hash_password(account.password).map_err(|e| e.to_string()))
        .collect();
}

impl SeedAccount {
    fn to_user(&self) -> Result<User> {
        let (y, m, d) = self.join_date;
        let join_date = NaiveDate::from_ymd_opt(y, m, d)
            .ok_or_else(|| anyhow!("Invalid join date for seed account {}", self.email))?;
        Ok(User {
            id: self.id.to_string(),
            name: self.name.to_string(),
            email: self.email.to_string(),
            role: self.role,
            department: self.department.to_string(),
            profile_picture: None,
            join_date,
            registration_number: self.registration_number.map(str::to_string),
            admin_level: self.admin_level,
            bio: None,
        })
    }
}

/// Seed the demo accounts, leave requests and activity
pub fn seed_demo_data(db: &MemoryDb) -> Result<()> {
    info!("Seeding demo directory...");

    let hashes = DEMO_PASSWORD_HASHES
        .as_ref()
        .map_err(|e| anyhow!("Failed to hash demo passwords: {}", e))?;

    for (account, password_hash) in DEMO_ACCOUNTS.iter().zip(hashes) {
        db.insert_record(UserRecord {
            user: account.to_user()?,
            password_hash: password_hash.clone(),
        });
    }

    let ts = |y, m, d, h, min| {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .ok_or_else(|| anyhow!("Invalid seed timestamp"))
    };
    let date = |y, m, d| {
        NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| anyhow!("Invalid seed date"))
    };

    db.insert_leave(LeaveRequest {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: "3".to_string(),
        leave_type: LeaveType::Vacation,
        start_date: date(2024, 3, 15)?,
        end_date: date(2024, 3, 20)?,
        reason: "Annual family vacation".to_string(),
        status: LeaveStatus::Pending,
        created_at: ts(2024, 3, 1, 8, 30)?,
        reviewed_by: None,
        reviewed_at: None,
    });
    db.insert_leave(LeaveRequest {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: "2".to_string(),
        leave_type: LeaveType::Sick,
        start_date: date(2024, 2, 12)?,
        end_date: date(2024, 2, 13)?,
        reason: "Seasonal flu".to_string(),
        status: LeaveStatus::Approved,
        created_at: ts(2024, 2, 12, 7, 45)?,
        reviewed_by: Some("1".to_string()),
        reviewed_at: Some(ts(2024, 2, 12, 10, 0)?),
    });

    let activity = [
        ("2", ActivityType::LeaveRequest, ts(2024, 2, 12, 7, 45)?, "Submitted sick leave for 2024-02-12 to 2024-02-13"),
        ("2", ActivityType::LeaveApproved, ts(2024, 2, 12, 10, 0)?, "Sick leave for 2024-02-12 to 2024-02-13 approved"),
        ("2", ActivityType::CheckIn, ts(2024, 2, 14, 9, 2)?, "Checked in"),
        ("2", ActivityType::CheckOut, ts(2024, 2, 14, 17, 31)?, "Checked out"),
        ("3", ActivityType::LeaveRequest, ts(2024, 3, 1, 8, 30)?, "Submitted vacation leave for 2024-03-15 to 2024-03-20"),
    ];
    for (user_id, activity_type, timestamp, details) in activity {
        db.record_activity(ActivityItem::at(user_id, activity_type, timestamp, details));
    }

    info!("Seeded {} demo accounts", DEMO_ACCOUNTS.len());
    Ok(())
}
