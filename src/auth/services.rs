// src/auth/services.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use timesheet_portal_api::{
    ChangePasswordRequest, LoginAttemptResponse, PasswordResetConfirmRequest, RegisterRequest,
};
use uuid::Uuid;

use super::jwt::{IssuedToken, JwtManager};
use super::lockout::{FailureEffect, LockoutPolicy, LockoutState, retry_after_secs};
use super::password::PasswordManager;
use crate::clock::Clock;
use crate::db::Store;
use crate::db::error::RepositoryError;
use crate::db::models::account::{Account, NewAccount, normalize_identifier};
use crate::db::models::login_attempt::{FailureReason, NewLoginAttempt};
use crate::db::models::password_reset::{PasswordResetToken, split_reset_token};
use crate::error::AppError;

const LOGIN_HISTORY_LIMIT: i64 = 20;
/// Column widths of `accounts.email` and `accounts.username`.
const EMAIL_MAX_CHARS: usize = 255;
const USERNAME_MAX_CHARS: usize = 100;
const INVALID_RESET_TOKEN_MESSAGE: &str = "Invalid or expired reset token";
const WEAK_PASSWORD_MESSAGE: &str =
    "Password must be at least 8 characters with uppercase, lowercase and numbers";

/// Why a login was refused, as far as the caller is allowed to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Unknown account, inactive account and wrong password all look alike.
    InvalidCredentials,
    Locked {
        until: DateTime<Utc>,
        retry_after_secs: u64,
    },
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Granted(IssuedToken),
    Denied(Denial),
}

pub struct AuthService {
    store: Store,
    jwt_manager: JwtManager,
    passwords: PasswordManager,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
    reset_token_ttl: Duration,
    /// Hash verified against when the account does not exist, so that the
    /// response takes as long as for a real account.
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Store,
        jwt_manager: JwtManager,
        passwords: PasswordManager,
        lockout: LockoutPolicy,
        clock: Arc<dyn Clock>,
        reset_token_ttl: Duration,
    ) -> Result<Self, AppError> {
        let dummy_hash = passwords.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            jwt_manager,
            passwords,
            lockout,
            clock,
            reset_token_ttl,
            dummy_hash,
        })
    }

    pub fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Vérifie les identifiants et applique le verrouillage après échecs répétés.
    ///
    /// Only storage, hashing and signing failures are `Err`; every refusal is
    /// a `LoginOutcome::Denied`.
    pub fn authenticate(
        &self,
        identifier: &str,
        password: &str,
        source_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginOutcome, AppError> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() || password.is_empty() {
            return Err(AppError::invalid_input(
                "Identifier and password are required",
            ));
        }
        let now = self.clock.now();
        let failed = |account_id, reason| {
            NewLoginAttempt::failed(account_id, &identifier, source_ip, user_agent, reason, now)
        };

        let account = match self.store.accounts.find_by_identifier(&identifier)? {
            Some(account) if account.is_active => account,
            Some(account) => {
                self.burn_verification(password);
                self.record_attempt(&failed(Some(account.id), FailureReason::InactiveAccount));
                tracing::info!(account_id = %account.id, "Login refused for inactive account");
                return Ok(LoginOutcome::Denied(Denial::InvalidCredentials));
            }
            None => {
                self.burn_verification(password);
                self.record_attempt(&failed(None, FailureReason::UnknownAccount));
                tracing::info!(%source_ip, "Login refused for unknown account");
                return Ok(LoginOutcome::Denied(Denial::InvalidCredentials));
            }
        };

        let locked_out = |until: DateTime<Utc>| {
            self.record_attempt(&failed(Some(account.id), FailureReason::AccountLocked));
            tracing::info!(account_id = %account.id, %until, "Login refused for locked account");
            LoginOutcome::Denied(Denial::Locked {
                until,
                retry_after_secs: retry_after_secs(until, now),
            })
        };

        // the snapshot above may predate a concurrent lock: decide on the stored row
        let mut locked = None;
        self.store.accounts.modify_lockout(account.id, now, &mut |state: &mut LockoutState| {
            self.lockout.clear_if_expired(state, now);
            locked = self.lockout.locked_until(state, now);
        })?;
        if let Some(until) = locked {
            return Ok(locked_out(until));
        }

        if !self.passwords.verify(password, &account.password_hash)? {
            let mut effect = None;
            self.store.accounts.modify_lockout(account.id, now, &mut |state: &mut LockoutState| {
                effect = Some(self.lockout.register_failure(state, now));
            })?;

            match effect {
                Some(FailureEffect::StillLocked(until)) => return Ok(locked_out(until)),
                Some(FailureEffect::LockedUntil(until)) => tracing::warn!(
                    account_id = %account.id,
                    %until,
                    "Account locked after repeated failed logins"
                ),
                Some(FailureEffect::Counted { failed_attempts }) => tracing::info!(
                    account_id = %account.id,
                    failed_attempts,
                    "Invalid password"
                ),
                None => {}
            }
            self.record_attempt(&failed(Some(account.id), FailureReason::InvalidPassword));
            return Ok(LoginOutcome::Denied(Denial::InvalidCredentials));
        }

        let mut admitted = Ok(());
        self.store.accounts.modify_lockout(account.id, now, &mut |state: &mut LockoutState| {
            admitted = self.lockout.register_success(state, now);
        })?;
        if let Err(until) = admitted {
            return Ok(locked_out(until));
        }

        self.store.accounts.record_successful_login(account.id, now)?;
        let issued = self.jwt_manager.issue(account.id, &account.email, now)?;
        self.record_attempt(&NewLoginAttempt::succeeded(
            account.id,
            &identifier,
            source_ip,
            user_agent,
            now,
        ));

        tracing::info!(account_id = %account.id, token_id = %issued.token_id, "Login succeeded");
        Ok(LoginOutcome::Granted(issued))
    }

    /// Inscription d'un nouvel account
    pub fn register(&self, request: RegisterRequest) -> Result<Account, AppError> {
        let email = normalize_identifier(&request.email);
        let username = normalize_identifier(&request.username);

        if !Self::is_valid_email(&email) {
            return Err(AppError::validation("email", "Invalid email format"));
        }
        if email.chars().count() > EMAIL_MAX_CHARS {
            return Err(AppError::validation(
                "email",
                format!("Email must be at most {EMAIL_MAX_CHARS} characters"),
            ));
        }
        if username.is_empty() || username.contains('@') {
            return Err(AppError::validation(
                "username",
                "Username must be non-empty and must not contain '@'",
            ));
        }
        if username.chars().count() > USERNAME_MAX_CHARS {
            return Err(AppError::validation(
                "username",
                format!("Username must be at most {USERNAME_MAX_CHARS} characters"),
            ));
        }
        if !Self::is_strong_password(&request.password) {
            return Err(AppError::WeakPassword(WEAK_PASSWORD_MESSAGE.to_string()));
        }

        if self.store.accounts.find_by_identifier(&email)?.is_some()
            || self.store.accounts.find_by_identifier(&username)?.is_some()
        {
            return Err(AppError::UserAlreadyExists);
        }
        if let Some(manager_id) = request.manager_id
            && self.store.accounts.find_by_id(manager_id)?.is_none()
        {
            return Err(AppError::validation("manager_id", "Unknown manager"));
        }

        let new_account = NewAccount {
            email,
            username,
            password_hash: self.passwords.hash(&request.password)?,
            manager_id: request.manager_id,
        };

        let account = self
            .store
            .accounts
            .create(&new_account)
            .map_err(|err| match err {
                // lost a race against a concurrent registration
                RepositoryError::UniqueViolation(_) => AppError::UserAlreadyExists,
                other => AppError::from(other),
            })?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    pub fn current_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        self.store
            .accounts
            .find_by_id(account_id)?
            .ok_or_else(|| AppError::not_found("Account not found"))
    }

    /// Change le mot de passe de l'account
    pub fn change_password(
        &self,
        account_id: Uuid,
        request: &ChangePasswordRequest,
    ) -> Result<(), AppError> {
        if !Self::is_strong_password(&request.new_password) {
            return Err(AppError::WeakPassword(WEAK_PASSWORD_MESSAGE.to_string()));
        }

        let account = self.current_account(account_id)?;
        if !self
            .passwords
            .verify(&request.old_password, &account.password_hash)?
        {
            return Err(AppError::InvalidCredentials);
        }

        let new_hash = self.passwords.hash(&request.new_password)?;
        self.store
            .accounts
            .update_password(account_id, &new_hash, self.clock.now())?;

        tracing::info!(%account_id, "Password changed");
        Ok(())
    }

    /// Émet un jeton de réinitialisation si l'email correspond à un account actif.
    ///
    /// The caller gets `Ok(())` either way so the endpoint cannot be used to
    /// probe which emails are registered.
    pub fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_identifier(email);
        if !Self::is_valid_email(&email) {
            return Err(AppError::validation("email", "Invalid email format"));
        }

        match self.store.accounts.find_by_identifier(&email)? {
            Some(account) if account.is_active && account.email == email => {
                let (token, expires_at) = self.issue_reset_token(&account)?;
                Self::deliver_reset_token(&account, &token, expires_at);
            }
            _ => {
                // same bcrypt work as issuing a token
                self.burn_verification(&email);
                tracing::info!("Password reset requested for an unknown or inactive account");
            }
        }
        Ok(())
    }

    /// Returns the token to hand to the user and its expiry.
    pub(crate) fn issue_reset_token(
        &self,
        account: &Account,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let now = self.clock.now();
        let secret = Uuid::new_v4().simple().to_string();
        let record = PasswordResetToken {
            id: Uuid::new_v4(),
            account_id: account.id,
            secret_hash: self.passwords.hash(&secret)?,
            expires_at: now + self.reset_token_ttl,
            used_at: None,
            created_at: now,
        };
        self.store.password_resets.create(&record)?;

        Ok((format!("{}.{secret}", record.id.simple()), record.expires_at))
    }

    // Pas d'envoi d'email: la remise du jeton est seulement journalisée, sans le secret.
    fn deliver_reset_token(account: &Account, token: &str, expires_at: DateTime<Utc>) {
        let token_id = token.split_once('.').map_or("", |(id, _)| id);
        tracing::info!(
            account_id = %account.id,
            email = %account.email,
            token_id,
            %expires_at,
            "Password reset token issued"
        );
    }

    /// Redeems a reset token: new password, counters cleared, token spent.
    pub fn reset_password(&self, request: &PasswordResetConfirmRequest) -> Result<(), AppError> {
        let invalid = || AppError::validation("token", INVALID_RESET_TOKEN_MESSAGE);

        if !Self::is_strong_password(&request.new_password) {
            return Err(AppError::WeakPassword(WEAK_PASSWORD_MESSAGE.to_string()));
        }
        let now = self.clock.now();

        let (id, secret) = split_reset_token(&request.token).ok_or_else(invalid)?;
        let Some(token) = self.store.password_resets.find_by_id(id)? else {
            return Err(invalid());
        };
        if !token.is_usable(now) || !self.passwords.verify(secret, &token.secret_hash)? {
            tracing::info!(token_id = %id, "Rejected password reset token");
            return Err(invalid());
        }

        let new_hash = self.passwords.hash(&request.new_password)?;
        if !self.store.password_resets.consume(id, now)? {
            return Err(invalid());
        }
        self.store
            .accounts
            .update_password(token.account_id, &new_hash, now)?;

        let mut was_locked = false;
        self.store.accounts.modify_lockout(token.account_id, now, &mut |state: &mut LockoutState| {
            was_locked = self.lockout.is_locked(state, now);
            self.lockout.reset(state);
        })?;

        tracing::info!(account_id = %token.account_id, was_locked, "Password reset");
        Ok(())
    }

    /// Dernières tentatives de connexion de l'account, la plus récente d'abord.
    pub fn login_history(&self, account_id: Uuid) -> Result<Vec<LoginAttemptResponse>, AppError> {
        Ok(self
            .store
            .login_attempts
            .recent_for_account(account_id, LOGIN_HISTORY_LIMIT)?
            .into_iter()
            .map(LoginAttemptResponse::from)
            .collect())
    }

    fn record_attempt(&self, attempt: &NewLoginAttempt) {
        if let Err(err) = self.store.login_attempts.record(attempt) {
            tracing::warn!(error = %err, success = attempt.success, "Failed to record login attempt");
        }
    }

    fn burn_verification(&self, password: &str) {
        let _ = self.passwords.verify(password, &self.dummy_hash);
    }

    // === Helpers de validation ===

    fn is_valid_email(email: &str) -> bool {
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        }
    }

    fn is_strong_password(password: &str) -> bool {
        if password.chars().count() < 8 {
            return false;
        }
        let (mut upper, mut lower, mut digit) = (false, false, false);
        for c in password.chars() {
            upper |= c.is_uppercase();
            lower |= c.is_lowercase();
            digit |= c.is_ascii_digit();
            if upper && lower && digit {
                return true;
            }
        }
        upper && lower && digit
    }
}
