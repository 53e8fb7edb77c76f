use super::AuditRepository;
use crate::db::DbPool;
use crate::db::error::RepositoryError;
use crate::db::models::audit_entry::AuditEntry;
use crate::db::schema::timesheet_audit;
use diesel::prelude::*;
use uuid::Uuid;

pub struct PgAuditRepository {
    pool: DbPool,
}

impl PgAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AuditRepository for PgAuditRepository {
    fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(timesheet_audit::table)
            .values(entry)
            .execute(&mut conn)?;

        Ok(())
    }

    fn list_for_timesheet(&self, timesheet_id: Uuid) -> Result<Vec<AuditEntry>, RepositoryError> {
        let mut conn = self.pool.get()?;

        timesheet_audit::table
            .filter(timesheet_audit::timesheet_id.eq(timesheet_id))
            .order_by(timesheet_audit::created_at.asc())
            .select(AuditEntry::as_select())
            .load::<AuditEntry>(&mut conn)
            .map_err(Into::into)
    }
}
