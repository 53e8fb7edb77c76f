use crate::auth::lockout::LockoutState;
use crate::db::schema::accounts;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use timesheet_portal_api::AccountResponse;
use uuid::Uuid;

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub manager_id: Option<Uuid>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub manager_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn lockout_state(&self) -> LockoutState {
        LockoutState {
            failed_attempts: self.failed_login_attempts,
            lockout_until: self.lockout_until,
        }
    }
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        AccountResponse {
            id: account.id,
            email: account.email,
            username: account.username,
            is_active: account.is_active,
            manager_id: account.manager_id,
            created_at: account.created_at,
            last_login_at: account.last_login_at,
        }
    }
}

/// Email et username sont stockés normalisés pour que la recherche soit insensible à la casse.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_identifier("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn response_omits_password_hash() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            username: "a".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            is_active: true,
            failed_login_attempts: 0,
            lockout_until: None,
            manager_id: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        let json = serde_json::to_string(&AccountResponse::from(account)).unwrap();
        assert!(!json.contains("secret"));
    }
}
