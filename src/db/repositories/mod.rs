//! Persistence seams.
//!
//! Services only talk to these traits; `crate::db::Store` bundles one
//! implementation of each (Postgres through diesel, or the in-memory store
//! used in development and tests).

pub mod account_repository;
pub mod audit_repository;
pub mod login_attempt_repository;
pub mod notification_repository;
pub mod password_reset_repository;
pub mod timesheet_repository;

use crate::auth::lockout::LockoutState;
use crate::db::error::RepositoryError;
use crate::db::models::account::{Account, NewAccount};
use crate::db::models::audit_entry::AuditEntry;
use crate::db::models::login_attempt::{LoginAttempt, NewLoginAttempt};
use crate::db::models::notification::Notification;
use crate::db::models::password_reset::PasswordResetToken;
use crate::timesheets::model::Timesheet;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub use account_repository::PgAccountRepository;
pub use audit_repository::PgAuditRepository;
pub use login_attempt_repository::PgLoginAttemptRepository;
pub use notification_repository::PgNotificationRepository;
pub use password_reset_repository::PgPasswordResetRepository;
pub use timesheet_repository::PgTimesheetRepository;

pub trait AccountRepository: Send + Sync {
    /// `identifier` is matched against email or username, already normalized.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, RepositoryError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError>;

    fn create(&self, new_account: &NewAccount) -> Result<Account, RepositoryError>;

    /// Read-modify-write of the lockout counters, atomic with respect to other
    /// callers on the same account. `apply` sees the current state and mutates
    /// it; the final state is persisted (only if it changed) and returned.
    /// Every lock decision has to be taken inside `apply`.
    fn modify_lockout(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut LockoutState),
    ) -> Result<LockoutState, RepositoryError>;

    /// Stamps `last_login_at`. The counters are reset through `modify_lockout`.
    fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

pub trait LoginAttemptRepository: Send + Sync {
    fn record(&self, attempt: &NewLoginAttempt) -> Result<(), RepositoryError>;

    /// Most recent first.
    fn recent_for_account(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LoginAttempt>, RepositoryError>;
}

pub trait PasswordResetRepository: Send + Sync {
    fn create(&self, token: &PasswordResetToken) -> Result<(), RepositoryError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<PasswordResetToken>, RepositoryError>;

    /// Marks the token used if it is still unused and unexpired at `at`.
    /// `false` means someone else redeemed it first (or it is dead).
    fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError>;
}

pub trait TimesheetRepository: Send + Sync {
    /// Soft-deleted timesheets are never returned.
    fn find_by_id(&self, id: Uuid) -> Result<Option<Timesheet>, RepositoryError>;

    fn find_for_week(
        &self,
        owner_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<Timesheet>, RepositoryError>;

    /// Newest week first.
    fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Timesheet>, RepositoryError>;

    /// Submitted timesheets awaiting `approver_id`, oldest submission first.
    fn list_pending_for_approver(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<Timesheet>, RepositoryError>;

    /// Fails with `UniqueViolation` when the owner already has a live
    /// timesheet for that week.
    fn insert(&self, sheet: &Timesheet) -> Result<Timesheet, RepositoryError>;

    /// Writes `sheet` only if the stored version still equals `sheet.version`
    /// (`StaleWrite` otherwise). The returned copy carries the bumped version.
    fn update(&self, sheet: &Timesheet, rewrite_entries: bool)
    -> Result<Timesheet, RepositoryError>;
}

pub trait AuditRepository: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError>;

    /// Oldest first.
    fn list_for_timesheet(&self, timesheet_id: Uuid) -> Result<Vec<AuditEntry>, RepositoryError>;
}

pub trait NotificationRepository: Send + Sync {
    fn create(&self, notification: &Notification) -> Result<(), RepositoryError>;

    /// Newest first.
    fn list_for_recipient(&self, recipient_id: Uuid)
    -> Result<Vec<Notification>, RepositoryError>;

    /// `false` when no such notification belongs to `recipient_id`.
    fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool, RepositoryError>;
}
