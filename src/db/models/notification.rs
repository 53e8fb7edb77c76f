use crate::db::schema::notifications;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use timesheet_portal_api::NotificationResponse;
use uuid::Uuid;

#[derive(Insertable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn unread(
        recipient_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            title: title.into(),
            message: message.into(),
            is_read: false,
            created_at: at,
        }
    }
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}
