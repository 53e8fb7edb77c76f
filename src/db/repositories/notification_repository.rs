use super::NotificationRepository;
use crate::db::DbPool;
use crate::db::error::RepositoryError;
use crate::db::models::notification::Notification;
use crate::db::schema::notifications;
use diesel::prelude::*;
use uuid::Uuid;

pub struct PgNotificationRepository {
    pool: DbPool,
}

impl PgNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NotificationRepository for PgNotificationRepository {
    fn create(&self, notification: &Notification) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(notifications::table)
            .values(notification)
            .execute(&mut conn)?;

        Ok(())
    }

    fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut conn = self.pool.get()?;

        notifications::table
            .filter(notifications::recipient_id.eq(recipient_id))
            .order_by(notifications::created_at.desc())
            .select(Notification::as_select())
            .load::<Notification>(&mut conn)
            .map_err(Into::into)
    }

    fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::recipient_id.eq(recipient_id)),
        )
        .set(notifications::is_read.eq(true))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }
}
