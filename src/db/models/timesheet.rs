use crate::db::error::RepositoryError;
use crate::db::schema::{timesheet_entries, timesheets};
use crate::timesheets::model::{Hours, Timesheet, TimesheetEntry, TimesheetStatus};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use uuid::Uuid;

#[derive(Insertable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = timesheets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TimesheetRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub week_start: NaiveDate,
    pub status: String,
    pub approver_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_reason: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Mutable columns. `None` writes NULL so decisions can be cleared.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = timesheets)]
#[diesel(treat_none_as_null = true)]
pub struct TimesheetChanges {
    pub status: String,
    pub approver_id: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_reason: Option<String>,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = timesheet_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EntryRow {
    pub id: Uuid,
    pub timesheet_id: Uuid,
    pub position: i32,
    pub project: String,
    pub task: String,
    pub work_date: NaiveDate,
    pub hours_centi: i32,
}

impl From<&Timesheet> for TimesheetRow {
    fn from(sheet: &Timesheet) -> Self {
        Self {
            id: sheet.id,
            owner_id: sheet.owner_id,
            week_start: sheet.week_start,
            status: sheet.status.as_str().to_string(),
            approver_id: sheet.approver_id,
            submitted_at: sheet.submitted_at,
            decided_by: sheet.decided_by,
            decided_at: sheet.decided_at,
            decision_reason: sheet.decision_reason.clone(),
            version: sheet.version,
            created_at: sheet.created_at,
            updated_at: sheet.updated_at,
            deleted_at: sheet.deleted_at,
        }
    }
}

impl TimesheetChanges {
    pub fn next_version_of(sheet: &Timesheet) -> Self {
        Self {
            status: sheet.status.as_str().to_string(),
            approver_id: sheet.approver_id,
            submitted_at: sheet.submitted_at,
            decided_by: sheet.decided_by,
            decided_at: sheet.decided_at,
            decision_reason: sheet.decision_reason.clone(),
            version: sheet.version + 1,
            updated_at: sheet.updated_at,
            deleted_at: sheet.deleted_at,
        }
    }
}

impl EntryRow {
    pub fn rows_for(sheet: &Timesheet) -> Vec<EntryRow> {
        sheet
            .entries
            .iter()
            .zip(0..)
            .map(|(entry, position)| EntryRow {
                id: Uuid::new_v4(),
                timesheet_id: sheet.id,
                position,
                project: entry.project.clone(),
                task: entry.task.clone(),
                work_date: entry.date,
                hours_centi: entry.hours.centi(),
            })
            .collect()
    }
}

impl TimesheetRow {
    /// `entries` must already be ordered by position.
    pub fn into_domain(self, entries: Vec<EntryRow>) -> Result<Timesheet, RepositoryError> {
        let status = self
            .status
            .parse::<TimesheetStatus>()
            .map_err(RepositoryError::DatabaseError)?;

        Ok(Timesheet {
            id: self.id,
            owner_id: self.owner_id,
            week_start: self.week_start,
            status,
            entries: entries
                .into_iter()
                .map(|row| TimesheetEntry {
                    project: row.project,
                    task: row.task,
                    date: row.work_date,
                    hours: Hours::from_centi(row.hours_centi),
                })
                .collect(),
            approver_id: self.approver_id,
            submitted_at: self.submitted_at,
            decided_by: self.decided_by,
            decided_at: self.decided_at,
            decision_reason: self.decision_reason,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}
