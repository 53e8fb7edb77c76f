use super::PasswordResetRepository;
use crate::db::DbPool;
use crate::db::error::RepositoryError;
use crate::db::models::password_reset::PasswordResetToken;
use crate::db::schema::password_reset_tokens;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct PgPasswordResetRepository {
    pool: DbPool,
}

impl PgPasswordResetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PasswordResetRepository for PgPasswordResetRepository {
    fn create(&self, token: &PasswordResetToken) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(password_reset_tokens::table)
            .values(token)
            .execute(&mut conn)?;

        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<PasswordResetToken>, RepositoryError> {
        let mut conn = self.pool.get()?;

        password_reset_tokens::table
            .find(id)
            .select(PasswordResetToken::as_select())
            .first::<PasswordResetToken>(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;

        // the WHERE clause makes redemption single-use under concurrency
        let updated = diesel::update(
            password_reset_tokens::table
                .filter(password_reset_tokens::id.eq(id))
                .filter(password_reset_tokens::used_at.is_null())
                .filter(password_reset_tokens::expires_at.gt(at)),
        )
        .set(password_reset_tokens::used_at.eq(Some(at)))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }
}
