use super::TimesheetRepository;
use crate::db::DbPool;
use crate::db::error::RepositoryError;
use crate::db::models::timesheet::{EntryRow, TimesheetChanges, TimesheetRow};
use crate::db::schema::{timesheet_entries, timesheets};
use crate::timesheets::model::{Timesheet, TimesheetStatus};
use chrono::NaiveDate;
use diesel::PgConnection;
use diesel::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

pub struct PgTimesheetRepository {
    pool: DbPool,
}

impl PgTimesheetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Charge les entries de chaque row en une seule requête et assemble les timesheets.
fn attach_entries(
    conn: &mut PgConnection,
    rows: Vec<TimesheetRow>,
) -> Result<Vec<Timesheet>, RepositoryError> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

    let mut by_sheet: HashMap<Uuid, Vec<EntryRow>> = HashMap::new();
    for entry in timesheet_entries::table
        .filter(timesheet_entries::timesheet_id.eq_any(ids))
        .order_by((
            timesheet_entries::timesheet_id,
            timesheet_entries::position,
        ))
        .select(EntryRow::as_select())
        .load::<EntryRow>(conn)?
    {
        by_sheet.entry(entry.timesheet_id).or_default().push(entry);
    }

    rows.into_iter()
        .map(|row| {
            let entries = by_sheet.remove(&row.id).unwrap_or_default();
            row.into_domain(entries)
        })
        .collect()
}

fn insert_entries(conn: &mut PgConnection, sheet: &Timesheet) -> Result<(), RepositoryError> {
    if sheet.entries.is_empty() {
        return Ok(());
    }
    diesel::insert_into(timesheet_entries::table)
        .values(EntryRow::rows_for(sheet))
        .execute(conn)?;
    Ok(())
}

fn first_live(
    conn: &mut PgConnection,
    row: Option<TimesheetRow>,
) -> Result<Option<Timesheet>, RepositoryError> {
    match row {
        Some(row) => Ok(attach_entries(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

impl TimesheetRepository for PgTimesheetRepository {
    fn find_by_id(&self, id: Uuid) -> Result<Option<Timesheet>, RepositoryError> {
        let mut conn = self.pool.get()?;

        let row = timesheets::table
            .find(id)
            .filter(timesheets::deleted_at.is_null())
            .select(TimesheetRow::as_select())
            .first::<TimesheetRow>(&mut conn)
            .optional()?;

        first_live(&mut conn, row)
    }

    fn find_for_week(
        &self,
        owner_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<Timesheet>, RepositoryError> {
        let mut conn = self.pool.get()?;

        let row = timesheets::table
            .filter(timesheets::owner_id.eq(owner_id))
            .filter(timesheets::week_start.eq(week_start))
            .filter(timesheets::deleted_at.is_null())
            .select(TimesheetRow::as_select())
            .first::<TimesheetRow>(&mut conn)
            .optional()?;

        first_live(&mut conn, row)
    }

    fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Timesheet>, RepositoryError> {
        let mut conn = self.pool.get()?;

        let rows = timesheets::table
            .filter(timesheets::owner_id.eq(owner_id))
            .filter(timesheets::deleted_at.is_null())
            .order_by(timesheets::week_start.desc())
            .select(TimesheetRow::as_select())
            .load::<TimesheetRow>(&mut conn)?;

        attach_entries(&mut conn, rows)
    }

    fn list_pending_for_approver(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<Timesheet>, RepositoryError> {
        let mut conn = self.pool.get()?;

        let rows = timesheets::table
            .filter(timesheets::approver_id.eq(approver_id))
            .filter(timesheets::status.eq(TimesheetStatus::Submitted.as_str()))
            .filter(timesheets::deleted_at.is_null())
            .order_by(timesheets::submitted_at.asc())
            .select(TimesheetRow::as_select())
            .load::<TimesheetRow>(&mut conn)?;

        attach_entries(&mut conn, rows)
    }

    fn insert(&self, sheet: &Timesheet) -> Result<Timesheet, RepositoryError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, RepositoryError, _>(|conn| {
            diesel::insert_into(timesheets::table)
                .values(TimesheetRow::from(sheet))
                .execute(conn)?;

            insert_entries(conn, sheet)?;

            Ok(sheet.clone())
        })
    }

    fn update(
        &self,
        sheet: &Timesheet,
        rewrite_entries: bool,
    ) -> Result<Timesheet, RepositoryError> {
        let mut conn = self.pool.get()?;
        let changes = TimesheetChanges::next_version_of(sheet);

        conn.transaction::<_, RepositoryError, _>(|conn| {
            let updated = diesel::update(
                timesheets::table
                    .filter(timesheets::id.eq(sheet.id))
                    .filter(timesheets::version.eq(sheet.version))
                    .filter(timesheets::deleted_at.is_null()),
            )
            .set(&changes)
            .execute(conn)?;

            if updated == 0 {
                return Err(RepositoryError::StaleWrite(format!(
                    "timesheet {} is no longer at version {}",
                    sheet.id, sheet.version
                )));
            }

            if rewrite_entries {
                diesel::delete(
                    timesheet_entries::table.filter(timesheet_entries::timesheet_id.eq(sheet.id)),
                )
                .execute(conn)?;

                insert_entries(conn, sheet)?;
            }

            let mut saved = sheet.clone();
            saved.version = changes.version;
            Ok(saved)
        })
    }
}
