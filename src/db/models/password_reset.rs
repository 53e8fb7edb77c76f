use crate::db::schema::password_reset_tokens;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use uuid::Uuid;

/// Jeton de réinitialisation. Seul le hash du secret est stocké; le jeton
/// remis à l'utilisateur est `<id>.<secret>`.
#[derive(Insertable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = password_reset_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub secret_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    /// Still redeemable at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

/// Splits `<id>.<secret>`; `None` for anything else.
pub fn split_reset_token(token: &str) -> Option<(Uuid, &str)> {
    let (id, secret) = token.trim().split_once('.')?;
    if secret.is_empty() {
        return None;
    }
    Some((Uuid::parse_str(id).ok()?, secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn token_is_usable_until_expiry_and_only_once() {
        let now = Utc::now();
        let mut token = PasswordResetToken {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            secret_hash: "hash".to_string(),
            expires_at: now + Duration::hours(1),
            used_at: None,
            created_at: now,
        };
        assert!(token.is_usable(now));
        assert!(!token.is_usable(now + Duration::hours(1)));

        token.used_at = Some(now);
        assert!(!token.is_usable(now));
    }

    #[test]
    fn reset_token_shape() {
        let id = Uuid::new_v4();
        let token = format!("{}.abc", id.simple());
        assert_eq!(split_reset_token(&token), Some((id, "abc")));
        assert_eq!(split_reset_token(&format!("{id}.")), None);
        assert_eq!(split_reset_token("not-a-uuid.abc"), None);
        assert_eq!(split_reset_token("no-separator"), None);
    }
}
