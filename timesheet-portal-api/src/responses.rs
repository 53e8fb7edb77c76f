use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    /// Seconds until `expires_at`
    pub expires_in: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimesheetStatusDto {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimesheetEntryResponse {
    pub project: String,
    pub task: String,
    pub date: NaiveDate,
    pub hours: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimesheetResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub status: TimesheetStatusDto,
    pub entries: Vec<TimesheetEntryResponse>,
    pub total_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TimesheetSummaryResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub status: TimesheetStatusDto,
    pub total_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub action: String,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// One row of the caller's own login history.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginAttemptResponse {
    pub success: bool,
    pub source_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub attempted_at: DateTime<Utc>,
}
