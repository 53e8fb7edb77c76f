//! Status transitions of a timesheet.
//!
//! ```text
//!   Draft ──submit──► Submitted ──approve──► Approved
//!     ▲                   │
//!     │ save_draft        └──reject──► Rejected ──submit──► Submitted
//!     └────────────────────────────────────┘
//! ```
//!
//! Every method checks its guards before touching the timesheet, so a
//! rejected transition leaves it unchanged.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Timesheet, TimesheetEntry, TimesheetStatus};
use super::validation::{self, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Edit,
    Submit,
    Approve,
    Reject,
    Delete,
}

impl Transition {
    fn verb(self) -> &'static str {
        match self {
            Self::Edit => "edited",
            Self::Submit => "submitted",
            Self::Approve => "approved",
            Self::Reject => "rejected",
            Self::Delete => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Only the owner can do this")]
    NotOwner,
    #[error("Only the assigned approver can decide on this timesheet")]
    NotApprover,
    #[error("A {status} timesheet cannot be {}", .transition.verb())]
    InvalidState {
        transition: Transition,
        status: TimesheetStatus,
    },
    #[error("No approver is assigned to the timesheet owner")]
    NoApprover,
    #[error("Validation failed: {0}")]
    Invalid(ValidationErrors),
}

impl From<ValidationErrors> for TransitionError {
    fn from(errors: ValidationErrors) -> Self {
        TransitionError::Invalid(errors)
    }
}

impl Timesheet {
    fn require_owner(&self, actor: Uuid) -> Result<(), TransitionError> {
        if self.owner_id == actor {
            Ok(())
        } else {
            Err(TransitionError::NotOwner)
        }
    }

    fn require_status(
        &self,
        transition: Transition,
        allowed: &[TimesheetStatus],
    ) -> Result<(), TransitionError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                transition,
                status: self.status,
            })
        }
    }

    fn require_approver(&self, actor: Uuid) -> Result<(), TransitionError> {
        if self.approver_id == Some(actor) {
            Ok(())
        } else {
            Err(TransitionError::NotApprover)
        }
    }

    fn clear_decision(&mut self) {
        self.decided_by = None;
        self.decided_at = None;
        self.decision_reason = None;
    }

    /// Remplace les lignes d'un brouillon. Un timesheet rejeté redevient brouillon.
    pub fn replace_entries(
        &mut self,
        actor: Uuid,
        entries: Vec<TimesheetEntry>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.require_owner(actor)?;
        self.require_status(
            Transition::Edit,
            &[TimesheetStatus::Draft, TimesheetStatus::Rejected],
        )?;

        if self.status == TimesheetStatus::Rejected {
            self.status = TimesheetStatus::Draft;
            self.approver_id = None;
            self.submitted_at = None;
            self.clear_decision();
        }
        self.entries = entries;
        self.updated_at = now;
        Ok(())
    }

    /// `approver` is the owner's manager at the time of submission.
    pub fn submit(
        &mut self,
        actor: Uuid,
        approver: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.require_owner(actor)?;
        self.require_status(
            Transition::Submit,
            &[TimesheetStatus::Draft, TimesheetStatus::Rejected],
        )?;
        validation::check_submittable(self)?;
        let approver = approver.ok_or(TransitionError::NoApprover)?;

        self.status = TimesheetStatus::Submitted;
        self.approver_id = Some(approver);
        self.submitted_at = Some(now);
        self.clear_decision();
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(&mut self, actor: Uuid, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.require_status(Transition::Approve, &[TimesheetStatus::Submitted])?;
        self.require_approver(actor)?;

        self.status = TimesheetStatus::Approved;
        self.decided_by = Some(actor);
        self.decided_at = Some(now);
        self.decision_reason = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(
        &mut self,
        actor: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.require_status(Transition::Reject, &[TimesheetStatus::Submitted])?;
        self.require_approver(actor)?;
        let reason = validation::check_reason(reason)?;

        self.status = TimesheetStatus::Rejected;
        self.decided_by = Some(actor);
        self.decided_at = Some(now);
        self.decision_reason = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    /// Soft delete; only drafts can go.
    pub fn delete(&mut self, actor: Uuid, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.require_owner(actor)?;
        self.require_status(Transition::Delete, &[TimesheetStatus::Draft])?;

        self.deleted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Owner and assigned approver may read a timesheet.
    pub fn is_visible_to(&self, actor: Uuid) -> bool {
        self.owner_id == actor || self.approver_id == Some(actor)
    }
}
