use std::sync::Arc;

use chrono::NaiveDate;
use timesheet_portal_api::{AuditEntryResponse, SaveTimesheetRequest, TimesheetSummaryResponse};
use uuid::Uuid;

use super::model::Timesheet;
use super::notifications::Notifier;
use super::validation;
use crate::clock::Clock;
use crate::db::Store;
use crate::db::error::RepositoryError;
use crate::db::models::audit_entry::{AuditAction, AuditEntry};
use crate::error::AppError;

/// Timesheet use cases: load, apply a state-machine transition, persist with
/// a version check, then write the audit trail.
pub struct TimesheetService {
    store: Store,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
}

impl TimesheetService {
    pub fn new(store: Store, notifier: Arc<Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Crée le brouillon de la semaine, ou remplace les lignes du brouillon existant.
    pub fn save_draft(
        &self,
        owner_id: Uuid,
        request: &SaveTimesheetRequest,
    ) -> Result<Timesheet, AppError> {
        let entries = validation::parse_draft(request.week_start, &request.entries)?;
        let now = self.clock.now();

        match self
            .store
            .timesheets
            .find_for_week(owner_id, request.week_start)?
        {
            None => {
                let sheet = Timesheet::new_draft(owner_id, request.week_start, entries, now);
                let saved = self.store.timesheets.insert(&sheet).map_err(|err| match err {
                    RepositoryError::UniqueViolation(_) => AppError::Conflict(format!(
                        "A timesheet for week {} already exists",
                        request.week_start
                    )),
                    other => AppError::from(other),
                })?;
                self.audit(&saved, AuditAction::Created, owner_id, None);
                tracing::info!(timesheet_id = %saved.id, %owner_id, week_start = %saved.week_start, "Timesheet created");
                Ok(saved)
            }
            Some(mut sheet) => {
                sheet.replace_entries(owner_id, entries, now)?;
                let saved = self.store.timesheets.update(&sheet, true)?;
                self.audit(&saved, AuditAction::Updated, owner_id, None);
                tracing::info!(timesheet_id = %saved.id, %owner_id, "Timesheet draft updated");
                Ok(saved)
            }
        }
    }

    /// The approver is the owner's manager at the time of submission.
    pub fn submit(&self, id: Uuid, actor: Uuid) -> Result<Timesheet, AppError> {
        let mut sheet = self.load(id)?;
        let approver = self
            .store
            .accounts
            .find_by_id(sheet.owner_id)?
            .and_then(|owner| owner.manager_id);

        sheet.submit(actor, approver, self.clock.now())?;
        let saved = self.store.timesheets.update(&sheet, false)?;
        self.audit(&saved, AuditAction::Submitted, actor, None);

        tracing::info!(timesheet_id = %id, approver_id = ?saved.approver_id, total_hours = %saved.total_hours(), "Timesheet submitted");
        Ok(saved)
    }

    pub fn approve(&self, id: Uuid, actor: Uuid) -> Result<Timesheet, AppError> {
        let mut sheet = self.load(id)?;

        sheet.approve(actor, self.clock.now())?;
        let saved = self.store.timesheets.update(&sheet, false)?;
        self.audit(&saved, AuditAction::Approved, actor, None);

        tracing::info!(timesheet_id = %id, approver_id = %actor, "Timesheet approved");
        Ok(saved)
    }

    pub fn reject(&self, id: Uuid, actor: Uuid, reason: &str) -> Result<Timesheet, AppError> {
        let mut sheet = self.load(id)?;
        let now = self.clock.now();

        sheet.reject(actor, reason, now)?;
        let saved = self.store.timesheets.update(&sheet, false)?;
        let reason = saved.decision_reason.clone().unwrap_or_default();
        self.audit(
            &saved,
            AuditAction::Rejected,
            actor,
            Some(format!("Reason: {reason}")),
        );
        self.notifier.timesheet_rejected(&saved, &reason, now);

        tracing::info!(timesheet_id = %id, approver_id = %actor, "Timesheet rejected");
        Ok(saved)
    }

    /// Soft delete; the week becomes free for a new draft.
    pub fn delete_draft(&self, id: Uuid, actor: Uuid) -> Result<(), AppError> {
        let mut sheet = self.load(id)?;

        sheet.delete(actor, self.clock.now())?;
        let saved = self.store.timesheets.update(&sheet, false)?;
        self.audit(&saved, AuditAction::Deleted, actor, None);

        tracing::info!(timesheet_id = %id, "Timesheet draft deleted");
        Ok(())
    }

    pub fn get(&self, id: Uuid, actor: Uuid) -> Result<Timesheet, AppError> {
        let sheet = self.load(id)?;
        if sheet.is_visible_to(actor) {
            Ok(sheet)
        } else {
            Err(AppError::Forbidden(
                "Only the owner or the assigned approver can view this timesheet".to_string(),
            ))
        }
    }

    pub fn get_for_week(&self, owner_id: Uuid, week_start: NaiveDate) -> Result<Timesheet, AppError> {
        validation::check_week_start(week_start)?;
        self.store
            .timesheets
            .find_for_week(owner_id, week_start)?
            .ok_or_else(|| AppError::not_found(format!("No timesheet for week {week_start}")))
    }

    /// Newest week first.
    pub fn history(&self, owner_id: Uuid) -> Result<Vec<TimesheetSummaryResponse>, AppError> {
        Ok(self
            .store
            .timesheets
            .list_for_owner(owner_id)?
            .iter()
            .map(Timesheet::summary)
            .collect())
    }

    pub fn pending_for_approver(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<TimesheetSummaryResponse>, AppError> {
        Ok(self
            .store
            .timesheets
            .list_pending_for_approver(approver_id)?
            .iter()
            .map(Timesheet::summary)
            .collect())
    }

    pub fn audit_trail(&self, id: Uuid, actor: Uuid) -> Result<Vec<AuditEntryResponse>, AppError> {
        let sheet = self.get(id, actor)?;
        Ok(self
            .store
            .audit
            .list_for_timesheet(sheet.id)?
            .into_iter()
            .map(AuditEntryResponse::from)
            .collect())
    }

    fn load(&self, id: Uuid) -> Result<Timesheet, AppError> {
        self.store
            .timesheets
            .find_by_id(id)?
            .ok_or_else(|| AppError::not_found("Timesheet not found"))
    }

    /// Append-only trail. Written after the state change is stored; a failure
    /// is logged rather than reported, since the change itself succeeded.
    fn audit(&self, sheet: &Timesheet, action: AuditAction, actor: Uuid, notes: Option<String>) {
        let entry = AuditEntry::new(sheet.id, action, actor, notes, sheet.updated_at);
        if let Err(err) = self.store.audit.append(&entry) {
            tracing::error!(error = %err, timesheet_id = %sheet.id, action = action.as_str(), "Failed to write audit entry");
        }
    }
}
