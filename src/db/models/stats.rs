//! Dashboard projection.
//!
//! `DashboardStats` is never stored; it is recomputed from the activity feed
//! and the leave requests of one user each time a dashboard is requested.
//! The reporting window is the current month up to and including `today`.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::activity::{ActivityItem, ActivityType};
use super::leave::{LeaveRequest, LeaveStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub present: u32,
    pub absent: u32,
    pub leave: u32,
    pub total_hours: f64,
}

impl DashboardStats {
    /// Project stats for one user's activity and leave requests.
    pub fn project(activity: &[ActivityItem], leaves: &[LeaveRequest], today: NaiveDate) -> Self {
        let window_start = today.with_day(1).unwrap_or(today);
        let in_window = |day: NaiveDate| day >= window_start && day <= today;

        let mut ordered: Vec<&ActivityItem> = activity.iter().collect();
        ordered.sort_by_key(|item| item.timestamp);

        let mut present_days = BTreeSet::new();
        let mut worked_minutes = 0i64;
        let mut open: Option<DateTime<Utc>> = None;

        for item in ordered {
            match item.activity_type {
                ActivityType::CheckIn => {
                    let day = item.timestamp.date_naive();
                    if in_window(day) {
                        present_days.insert(day);
                    }
                    if open.is_some() {
                        tracing::warn!(
                            "Check-in without check-out: user_id={}, item_id={}",
                            item.user_id,
                            item.id
                        );
                    }
                    open = Some(item.timestamp);
                }
                ActivityType::CheckOut => match open.take() {
                    Some(start) if in_window(start.date_naive()) => {
                        worked_minutes += item.timestamp.signed_duration_since(start).num_minutes();
                    }
                    Some(_) => {}
                    None => {
                        tracing::warn!(
                            "Check-out without check-in: user_id={}, item_id={}",
                            item.user_id,
                            item.id
                        );
                    }
                },
                _ => {}
            }
        }

        let mut leave_days = BTreeSet::new();
        for leave in leaves.iter().filter(|l| l.status == LeaveStatus::Approved) {
            let first = leave.start_date.max(window_start);
            let last = leave.end_date.min(today);
            leave_days.extend(first.iter_days().take_while(|d| *d <= last));
        }

        let absent = window_start
            .iter_days()
            .take_while(|d| *d <= today)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .filter(|d| !present_days.contains(d) && !leave_days.contains(d))
            .count();

        Self {
            present: present_days.len() as u32,
            absent: absent as u32,
            leave: leave_days.len() as u32,
            total_hours: (worked_minutes as f64 / 60.0 * 10.0).round() / 10.0,
        }
    }
}
