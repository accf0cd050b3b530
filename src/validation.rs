//! Input validation shared by the view layer and the HTTP handlers.
//!
//! Callers validate before invoking a data service; the services trust
//! their input. The HTTP handlers run the same checks again because the wire
//! is untrusted. For collecting several failures into one response, use
//! `ValidationErrorBuilder` from the api error module.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::db::NewLeaveRequest;

lazy_static! {
    /// Pragmatic email shape check: local@domain.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$"
    ).unwrap();

    /// Student registration numbers, e.g. MLV-2024-0042
    static ref REGISTRATION_NUMBER_REGEX: Regex = Regex::new(
        r"^[A-Z]{2,5}-\d{4}-\d{3,6}$"
    ).unwrap();
}

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_REASON_LENGTH: usize = 1000;
pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

/// End date must not precede start date
pub fn validate_leave_dates(start: NaiveDate, end: NaiveDate) -> Result<(), String> {
    if end < start {
        return Err("End date cannot be before start date".to_string());
    }
    Ok(())
}

pub fn validate_leave_reason(reason: &str) -> Result<(), String> {
    if reason.trim().is_empty() {
        return Err("Reason is required".to_string());
    }
    if reason.len() > MAX_REASON_LENGTH {
        return Err(format!(
            "Reason is too long (max {} characters)",
            MAX_REASON_LENGTH
        ));
    }
    Ok(())
}

/// Every check a leave form must pass, as (field, message) pairs
pub fn leave_request_errors(request: &NewLeaveRequest) -> Vec<(&'static str, String)> {
    let mut errors = Vec::new();
    if let Err(e) = validate_leave_dates(request.start_date, request.end_date) {
        errors.push(("endDate", e));
    }
    if let Err(e) = validate_leave_reason(&request.reason) {
        errors.push(("reason", e));
    }
    errors
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.len() > 100 {
        return Err("Name is too long (max 100 characters)".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

/// New password checks done before calling `changePassword`
pub fn validate_password_change(new: &str, confirm: &str) -> Result<(), String> {
    if new != confirm {
        return Err("New passwords do not match".to_string());
    }
    validate_password(new)
}

pub fn validate_registration_number(number: &Option<String>) -> Result<(), String> {
    if let Some(n) = number {
        if !REGISTRATION_NUMBER_REGEX.is_match(n) {
            return Err("Invalid registration number format (e.g. MLV-2024-0042)".to_string());
        }
    }
    Ok(())
}

pub fn validate_picture(content_type: &str, size: usize) -> Result<(), String> {
    if !content_type.starts_with("image/") {
        return Err("Profile picture must be an image".to_string());
    }
    if size == 0 {
        return Err("Profile picture is empty".to_string());
    }
    if size > MAX_PICTURE_BYTES {
        return Err("Profile picture is too large (max 5 MB)".to_string());
    }
    Ok(())
}
