use super::AccountRepository;
use crate::auth::lockout::LockoutState;
use crate::db::DbPool;
use crate::db::error::RepositoryError;
use crate::db::models::account::{Account, NewAccount};
use crate::db::schema::accounts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct PgAccountRepository {
    pool: DbPool,
}

impl PgAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AccountRepository for PgAccountRepository {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, RepositoryError> {
        let mut conn = self.pool.get()?;

        accounts::table
            .filter(
                accounts::email
                    .eq(identifier)
                    .or(accounts::username.eq(identifier)),
            )
            .select(Account::as_select())
            .first::<Account>(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    /// Trouver un account par ID
    fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, RepositoryError> {
        let mut conn = self.pool.get()?;

        accounts::table
            .find(id)
            .select(Account::as_select())
            .first::<Account>(&mut conn)
            .optional()
            .map_err(Into::into)
    }

    fn create(&self, new_account: &NewAccount) -> Result<Account, RepositoryError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(accounts::table)
            .values(new_account)
            .returning(Account::as_returning())
            .get_result::<Account>(&mut conn)
            .map_err(Into::into)
    }

    fn modify_lockout(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        apply: &mut dyn FnMut(&mut LockoutState),
    ) -> Result<LockoutState, RepositoryError> {
        let mut conn = self.pool.get()?;

        // SELECT ... FOR UPDATE serialises concurrent failures on the same row
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let account = accounts::table
                .find(id)
                .select(Account::as_select())
                .for_update()
                .first::<Account>(conn)?;

            let before = account.lockout_state();
            let mut state = before;
            apply(&mut state);

            if state != before {
                diesel::update(accounts::table.find(id))
                    .set((
                        accounts::failed_login_attempts.eq(state.failed_attempts),
                        accounts::lockout_until.eq(state.lockout_until),
                        accounts::updated_at.eq(now),
                    ))
                    .execute(conn)?;
            }

            Ok(state)
        })
    }

    /// Mettre à jour le dernier login
    fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(accounts::table.find(id))
            .set((
                accounts::last_login_at.eq(Some(at)),
                accounts::updated_at.eq(at),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("account {id}")));
        }
        Ok(())
    }

    // Mettre à jour le mot de passe
    fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(accounts::table.find(id))
            .set((
                accounts::password_hash.eq(password_hash),
                accounts::updated_at.eq(at),
            ))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(RepositoryError::NotFound(format!("account {id}")));
        }
        Ok(())
    }
}
