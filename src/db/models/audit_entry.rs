use crate::db::schema::timesheet_audit;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use timesheet_portal_api::AuditEntryResponse;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    Submitted,
    Approved,
    Rejected,
    Deleted,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Insertable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = timesheet_audit)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuditEntry {
    pub id: Uuid,
    pub timesheet_id: Uuid,
    pub action: String,
    pub performed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        timesheet_id: Uuid,
        action: AuditAction,
        performed_by: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timesheet_id,
            action: action.as_str().to_string(),
            performed_by,
            notes,
            created_at: at,
        }
    }
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id,
            action: entry.action,
            performed_by: entry.performed_by,
            created_at: entry.created_at,
            notes: entry.notes,
        }
    }
}
