use super::LoginAttemptRepository;
use crate::db::DbPool;
use crate::db::error::RepositoryError;
use crate::db::models::login_attempt::{LoginAttempt, NewLoginAttempt};
use crate::db::schema::login_attempts;
use diesel::prelude::*;
use uuid::Uuid;

pub struct PgLoginAttemptRepository {
    pool: DbPool,
}

impl PgLoginAttemptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl LoginAttemptRepository for PgLoginAttemptRepository {
    /// Créer une tentative de login
    fn record(&self, attempt: &NewLoginAttempt) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(login_attempts::table)
            .values(attempt)
            .execute(&mut conn)?;

        Ok(())
    }

    /// Récupérer les dernières tentatives d'un account
    fn recent_for_account(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LoginAttempt>, RepositoryError> {
        let mut conn = self.pool.get()?;

        login_attempts::table
            .filter(login_attempts::account_id.eq(account_id))
            .order_by(login_attempts::attempted_at.desc())
            .limit(limit)
            .select(LoginAttempt::as_select())
            .load::<LoginAttempt>(&mut conn)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_pool;
    use crate::db::models::login_attempt::FailureReason;
    use chrono::Utc;

    #[test]
    #[ignore = "requires DATABASE_URL"]
    fn unknown_account_attempt_is_recorded_without_account() {
        let repo = PgLoginAttemptRepository::new(test_pool());
        let attempt = NewLoginAttempt::failed(
            None,
            "nobody@example.com",
            "127.0.0.1",
            None,
            FailureReason::UnknownAccount,
            Utc::now(),
        );
        assert!(repo.record(&attempt).is_ok());
    }
}
