use chrono::{DateTime, Utc};
use timesheet_portal_api::NotificationResponse;
use uuid::Uuid;

use super::model::Timesheet;
use crate::db::Store;
use crate::db::models::notification::Notification;
use crate::error::AppError;

/// Stores in-app notifications. Delivery beyond the portal is only logged.
pub struct Notifier {
    store: Store,
}

impl Notifier {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Tells the owner their timesheet was sent back. Best effort: a storage
    /// failure is logged and does not undo the rejection.
    pub fn timesheet_rejected(&self, sheet: &Timesheet, reason: &str, now: DateTime<Utc>) {
        let message = format!(
            "Your timesheet for week {} to {} has been rejected. Reason: {}",
            sheet.week_start,
            sheet.week_end(),
            reason
        );
        let notification = Notification::unread(sheet.owner_id, "Timesheet rejected", message, now);

        match self.store.notifications.create(&notification) {
            Ok(()) => tracing::info!(
                recipient_id = %sheet.owner_id,
                timesheet_id = %sheet.id,
                reason,
                "Rejection notification sent"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                recipient_id = %sheet.owner_id,
                timesheet_id = %sheet.id,
                "Failed to store rejection notification"
            ),
        }
    }

    pub fn list(&self, recipient_id: Uuid) -> Result<Vec<NotificationResponse>, AppError> {
        Ok(self
            .store
            .notifications
            .list_for_recipient(recipient_id)?
            .into_iter()
            .map(NotificationResponse::from)
            .collect())
    }

    pub fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<(), AppError> {
        if self.store.notifications.mark_read(id, recipient_id)? {
            Ok(())
        } else {
            Err(AppError::not_found("Notification not found"))
        }
    }
}
