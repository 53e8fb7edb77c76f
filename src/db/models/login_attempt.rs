use crate::db::schema::login_attempts;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use timesheet_portal_api::LoginAttemptResponse;
use uuid::Uuid;

/// Why an attempt was refused. Stored for auditing only; callers only ever see
/// "invalid credentials" or "locked".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    UnknownAccount,
    InactiveAccount,
    InvalidPassword,
    AccountLocked,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownAccount => "unknown_account",
            Self::InactiveAccount => "inactive_account",
            Self::InvalidPassword => "invalid_password",
            Self::AccountLocked => "account_locked",
        }
    }
}

/// Widths of `login_attempts.identifier` and `login_attempts.source_ip`.
const IDENTIFIER_MAX_CHARS: usize = 255;
const SOURCE_IP_MAX_CHARS: usize = 64;

fn clamp(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = login_attempts)]
pub struct NewLoginAttempt {
    pub account_id: Option<Uuid>,
    pub identifier: String,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl NewLoginAttempt {
    pub fn succeeded(
        account_id: Uuid,
        identifier: &str,
        source_ip: &str,
        user_agent: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: Some(account_id),
            identifier: clamp(identifier, IDENTIFIER_MAX_CHARS),
            source_ip: clamp(source_ip, SOURCE_IP_MAX_CHARS),
            user_agent: user_agent.map(str::to_string),
            success: true,
            failure_reason: None,
            attempted_at: at,
        }
    }

    pub fn failed(
        account_id: Option<Uuid>,
        identifier: &str,
        source_ip: &str,
        user_agent: Option<&str>,
        reason: FailureReason,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            identifier: clamp(identifier, IDENTIFIER_MAX_CHARS),
            source_ip: clamp(source_ip, SOURCE_IP_MAX_CHARS),
            user_agent: user_agent.map(str::to_string),
            success: false,
            failure_reason: Some(reason.as_str().to_string()),
            attempted_at: at,
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = login_attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LoginAttempt {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub identifier: String,
    pub source_ip: String,
    pub user_agent: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl From<LoginAttempt> for LoginAttemptResponse {
    fn from(attempt: LoginAttempt) -> Self {
        Self {
            success: attempt.success,
            source_ip: attempt.source_ip,
            user_agent: attempt.user_agent,
            attempted_at: attempt.attempted_at,
        }
    }
}
