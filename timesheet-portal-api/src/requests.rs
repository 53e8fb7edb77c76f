use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -------- REQUEST DTOs --------
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String, // Plain text
    /// Account that approves this account's timesheets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,
}

/// `identifier` is either the email address or the username.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    pub identifier: String,
    pub password: String, // Plain text
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Always answered the same way, whether the email is known or not.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PasswordResetConfirmRequest {
    /// The token delivered out of band, as `<id>.<secret>`.
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimesheetEntryRequest {
    pub project: String,
    #[serde(default)]
    pub task: String,
    pub date: NaiveDate,
    pub hours: f64,
}

/// Creates the draft for `week_start` or replaces the entries of the existing one.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SaveTimesheetRequest {
    pub week_start: NaiveDate,
    #[serde(default)]
    pub entries: Vec<TimesheetEntryRequest>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RejectTimesheetRequest {
    pub reason: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WeekQuery {
    pub week_start: NaiveDate,
}
