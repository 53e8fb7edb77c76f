//! In-process store used when no `DATABASE_URL` is configured (local
//! development) and by the service and router tests. It enforces the same
//! uniqueness, foreign-key and version rules as the Postgres schema.

use super::error::RepositoryError;
use super::models::account::{Account, NewAccount};
use super::models::audit_entry::AuditEntry;
use super::models::login_attempt::{LoginAttempt, NewLoginAttempt};
use super::models::notification::Notification;
use super::models::password_reset::PasswordResetToken;
use super::repositories::{
    AccountRepository, AuditRepository, LoginAttemptRepository, NotificationRepository,
    PasswordResetRepository, TimesheetRepository,
};
use crate::auth::lockout::LockoutState;
use crate::timesheets::model::{Timesheet, TimesheetStatus};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    login_attempts: Vec<LoginAttempt>,
    timesheets: HashMap<Uuid, Timesheet>,
    audit: Vec<AuditEntry>,
    notifications: Vec<Notification>,
    reset_tokens: HashMap<Uuid, PasswordResetToken>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::PoolError("in-memory store poisoned".to_string()))
    }

    /// Every recorded login attempt, oldest first.
    #[cfg(test)]
    pub fn login_attempts(&self) -> Vec<LoginAttempt> {
        self.lock().map(|s| s.login_attempts.clone()).unwrap_or_default()
    }

    #[cfg(test)]
    pub fn reset_tokens_for(&self, account_id: Uuid) -> Vec<PasswordResetToken> {
        self.lock()
            .map(|s| {
                s.reset_tokens
                    .values()
                    .filter(|t| t.account_id == account_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn account_mut<'a>(
    state: &'a mut MemoryState,
    id: Uuid,
) -> Result<&'a mut Account, RepositoryError> {
    state
        .accounts
        .get_mut(&id)
        .ok_or_else(|| RepositoryError::NotFound(format!("account {id}")))
}

impl AccountRepository for MemoryStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email == identifier || a.username == identifier)
            .cloned())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    fn create(&self, new_account: &NewAccount) -> Result<Account, RepositoryError> {
        let mut state = self.lock()?;

        if state
            .accounts
            .values()
            .any(|a| a.email == new_account.email || a.username == new_account.username)
        {
            return Err(RepositoryError::UniqueViolation(
                "accounts email or username".to_string(),
            ));
        }
        if let Some(manager_id) = new_account.manager_id
            && !state.accounts.contains_key(&manager_id)
        {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "manager {manager_id}"
            )));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: new_account.email.clone(),
            username: new_account.username.clone(),
            password_hash: new_account.password_hash.clone(),
            is_active: true,
            failed_login_attempts: 0,
            lockout_until: None,
            manager_id: new_account.manager_id,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn modify_lockout(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut LockoutState),
    ) -> Result<LockoutState, RepositoryError> {
        // the guard is held across read, apply and write
        let mut state = self.lock()?;
        let account = account_mut(&mut state, id)?;

        let before = account.lockout_state();
        let mut lockout = before;
        apply(&mut lockout);

        if lockout != before {
            account.failed_login_attempts = lockout.failed_attempts;
            account.lockout_until = lockout.lockout_until;
            account.updated_at = now;
        }
        Ok(lockout)
    }

    fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let account = account_mut(&mut state, id)?;
        account.last_login_at = Some(at);
        account.updated_at = at;
        Ok(())
    }

    fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        let account = account_mut(&mut state, id)?;
        account.password_hash = password_hash.to_string();
        account.updated_at = at;
        Ok(())
    }
}

impl LoginAttemptRepository for MemoryStore {
    fn record(&self, attempt: &NewLoginAttempt) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        state.login_attempts.push(LoginAttempt {
            id: Uuid::new_v4(),
            account_id: attempt.account_id,
            identifier: attempt.identifier.clone(),
            source_ip: attempt.source_ip.clone(),
            user_agent: attempt.user_agent.clone(),
            success: attempt.success,
            failure_reason: attempt.failure_reason.clone(),
            attempted_at: attempt.attempted_at,
        });
        Ok(())
    }

    fn recent_for_account(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LoginAttempt>, RepositoryError> {
        let state = self.lock()?;
        let mut attempts: Vec<LoginAttempt> = state
            .login_attempts
            .iter()
            .filter(|a| a.account_id == Some(account_id))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));
        attempts.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(attempts)
    }
}

impl PasswordResetRepository for MemoryStore {
    fn create(&self, token: &PasswordResetToken) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if !state.accounts.contains_key(&token.account_id) {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "account {}",
                token.account_id
            )));
        }
        state.reset_tokens.insert(token.id, token.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<PasswordResetToken>, RepositoryError> {
        Ok(self.lock()?.reset_tokens.get(&id).cloned())
    }

    fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut state = self.lock()?;
        match state.reset_tokens.get_mut(&id) {
            Some(token) if token.is_usable(at) => {
                token.used_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn live(sheet: &Timesheet) -> bool {
    sheet.deleted_at.is_none()
}

impl TimesheetRepository for MemoryStore {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Timesheet>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.timesheets.get(&id).filter(|s| live(s)).cloned())
    }

    fn find_for_week(
        &self,
        owner_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<Timesheet>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .timesheets
            .values()
            .find(|s| live(s) && s.owner_id == owner_id && s.week_start == week_start)
            .cloned())
    }

    fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Timesheet>, RepositoryError> {
        let state = self.lock()?;
        let mut sheets: Vec<Timesheet> = state
            .timesheets
            .values()
            .filter(|s| live(s) && s.owner_id == owner_id)
            .cloned()
            .collect();
        sheets.sort_by(|a, b| b.week_start.cmp(&a.week_start));
        Ok(sheets)
    }

    fn list_pending_for_approver(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<Timesheet>, RepositoryError> {
        let state = self.lock()?;
        let mut sheets: Vec<Timesheet> = state
            .timesheets
            .values()
            .filter(|s| {
                live(s)
                    && s.status == TimesheetStatus::Submitted
                    && s.approver_id == Some(approver_id)
            })
            .cloned()
            .collect();
        sheets.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(sheets)
    }

    fn insert(&self, sheet: &Timesheet) -> Result<Timesheet, RepositoryError> {
        let mut state = self.lock()?;

        if !state.accounts.contains_key(&sheet.owner_id) {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "owner {}",
                sheet.owner_id
            )));
        }
        if state
            .timesheets
            .values()
            .any(|s| live(s) && s.owner_id == sheet.owner_id && s.week_start == sheet.week_start)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "timesheet for week {} already exists",
                sheet.week_start
            )));
        }

        state.timesheets.insert(sheet.id, sheet.clone());
        Ok(sheet.clone())
    }

    fn update(
        &self,
        sheet: &Timesheet,
        _rewrite_entries: bool,
    ) -> Result<Timesheet, RepositoryError> {
        let mut state = self.lock()?;

        let stored = state
            .timesheets
            .get_mut(&sheet.id)
            .filter(|s| live(s) && s.version == sheet.version)
            .ok_or_else(|| {
                RepositoryError::StaleWrite(format!(
                    "timesheet {} is no longer at version {}",
                    sheet.id, sheet.version
                ))
            })?;

        let mut saved = sheet.clone();
        saved.version = sheet.version + 1;
        *stored = saved.clone();
        Ok(saved)
    }
}

impl AuditRepository for MemoryStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        self.lock()?.audit.push(entry.clone());
        Ok(())
    }

    fn list_for_timesheet(&self, timesheet_id: Uuid) -> Result<Vec<AuditEntry>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .audit
            .iter()
            .filter(|e| e.timesheet_id == timesheet_id)
            .cloned()
            .collect())
    }
}

impl NotificationRepository for MemoryStore {
    fn create(&self, notification: &Notification) -> Result<(), RepositoryError> {
        self.lock()?.notifications.push(notification.clone());
        Ok(())
    }

    fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let state = self.lock()?;
        let mut found: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool, RepositoryError> {
        let mut state = self.lock()?;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timesheets::model::{Hours, TimesheetEntry};

    fn account(store: &MemoryStore, name: &str) -> Account {
        AccountRepository::create(
            store,
            &NewAccount {
                email: format!("{name}@example.com"),
                username: name.to_string(),
                password_hash: "hash".to_string(),
                manager_id: None,
            },
        )
        .unwrap()
    }

    fn draft(owner_id: Uuid) -> Timesheet {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        Timesheet::new_draft(
            owner_id,
            monday,
            vec![TimesheetEntry {
                project: "Portal".to_string(),
                task: String::new(),
                date: monday,
                hours: Hours::whole(8),
            }],
            Utc::now(),
        )
    }

    #[test]
    fn duplicate_username_is_a_unique_violation() {
        let store = MemoryStore::default();
        account(&store, "alice");

        let result = AccountRepository::create(
            &store,
            &NewAccount {
                email: "other@example.com".to_string(),
                username: "alice".to_string(),
                password_hash: "hash".to_string(),
                manager_id: None,
            },
        );
        assert!(matches!(result, Err(RepositoryError::UniqueViolation(_))));
    }

    #[test]
    fn unknown_manager_is_a_foreign_key_violation() {
        let store = MemoryStore::default();
        let result = AccountRepository::create(
            &store,
            &NewAccount {
                email: "bob@example.com".to_string(),
                username: "bob".to_string(),
                password_hash: "hash".to_string(),
                manager_id: Some(Uuid::new_v4()),
            },
        );
        assert!(matches!(result, Err(RepositoryError::ForeignKeyViolation(_))));
    }

    #[test]
    fn lookup_matches_email_or_username() {
        let store = MemoryStore::default();
        let alice = account(&store, "alice");

        let by_email = store.find_by_identifier("alice@example.com").unwrap();
        let by_name = store.find_by_identifier("alice").unwrap();
        assert_eq!(by_email.map(|a| a.id), Some(alice.id));
        assert_eq!(by_name.map(|a| a.id), Some(alice.id));
    }

    #[test]
    fn one_live_timesheet_per_week() {
        let store = MemoryStore::default();
        let owner = account(&store, "alice");

        let first = TimesheetRepository::insert(&store, &draft(owner.id)).unwrap();
        assert!(matches!(
            TimesheetRepository::insert(&store, &draft(owner.id)),
            Err(RepositoryError::UniqueViolation(_))
        ));

        // once the first is soft-deleted the week is free again
        let mut deleted = first.clone();
        deleted.deleted_at = Some(Utc::now());
        store.update(&deleted, false).unwrap();
        assert!(TimesheetRepository::insert(&store, &draft(owner.id)).is_ok());
        assert!(TimesheetRepository::find_by_id(&store, first.id).unwrap().is_none());
    }

    #[test]
    fn stale_update_is_refused() {
        let store = MemoryStore::default();
        let owner = account(&store, "alice");
        let sheet = TimesheetRepository::insert(&store, &draft(owner.id)).unwrap();

        let saved = store.update(&sheet, false).unwrap();
        assert_eq!(saved.version, 1);
        assert!(matches!(
            store.update(&sheet, false),
            Err(RepositoryError::StaleWrite(_))
        ));
    }

    #[test]
    fn mark_read_only_touches_own_notifications() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let n = Notification::unread(owner, "t", "m", Utc::now());
        NotificationRepository::create(&store, &n).unwrap();

        assert!(!store.mark_read(n.id, Uuid::new_v4()).unwrap());
        assert!(store.mark_read(n.id, owner).unwrap());
        assert!(store.list_for_recipient(owner).unwrap()[0].is_read);
    }

    #[test]
    fn reset_token_is_consumed_once() {
        let store = MemoryStore::default();
        let owner = account(&store, "alice");
        let now = Utc::now();
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            account_id: owner.id,
            secret_hash: "hash".to_string(),
            expires_at: now + chrono::Duration::hours(1),
            used_at: None,
            created_at: now,
        };
        PasswordResetRepository::create(&store, &token).unwrap();

        assert!(store.consume(token.id, now).unwrap());
        assert!(!store.consume(token.id, now).unwrap());
        assert!(!store.consume(Uuid::new_v4(), now).unwrap());
    }

    #[test]
    fn lockout_write_is_skipped_when_nothing_changes() {
        let store = MemoryStore::default();
        let alice = account(&store, "alice");
        let later = alice.updated_at + chrono::Duration::minutes(5);

        store.modify_lockout(alice.id, later, &mut |_: &mut LockoutState| {}).unwrap();
        let unchanged = AccountRepository::find_by_id(&store, alice.id).unwrap().unwrap();
        assert_eq!(unchanged.updated_at, alice.updated_at);

        store
            .modify_lockout(alice.id, later, &mut |s: &mut LockoutState| s.failed_attempts = 1)
            .unwrap();
        let changed = AccountRepository::find_by_id(&store, alice.id).unwrap().unwrap();
        assert_eq!(changed.updated_at, later);
        assert_eq!(changed.failed_login_attempts, 1);
    }

    #[test]
    fn recent_attempts_are_newest_first_and_limited() {
        let store = MemoryStore::default();
        let id = Uuid::new_v4();
        let start = Utc::now();
        for minutes in 0..3 {
            let at = start + chrono::Duration::minutes(minutes);
            store
                .record(&NewLoginAttempt::succeeded(id, "a", "ip", None, at))
                .unwrap();
        }

        let recent = store.recent_for_account(id, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].attempted_at, start + chrono::Duration::minutes(2));
    }
}
