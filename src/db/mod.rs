pub mod connection;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod schema;

use diesel::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use memory::MemoryStore;
use repositories::{
    AccountRepository, AuditRepository, LoginAttemptRepository, NotificationRepository,
    PasswordResetRepository, PgAccountRepository, PgAuditRepository, PgLoginAttemptRepository,
    PgNotificationRepository, PgPasswordResetRepository, PgTimesheetRepository,
    TimesheetRepository,
};
use std::sync::Arc;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// One handle per repository, shared by every service.
#[derive(Clone)]
pub struct Store {
    pub accounts: Arc<dyn AccountRepository>,
    pub login_attempts: Arc<dyn LoginAttemptRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
    pub timesheets: Arc<dyn TimesheetRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Store {
    pub fn postgres(pool: &DbPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            login_attempts: Arc::new(PgLoginAttemptRepository::new(pool.clone())),
            password_resets: Arc::new(PgPasswordResetRepository::new(pool.clone())),
            timesheets: Arc::new(PgTimesheetRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool.clone())),
        }
    }

    pub fn in_memory() -> Self {
        Self::backed_by(&Arc::new(MemoryStore::default()))
    }

    pub fn backed_by(memory: &Arc<MemoryStore>) -> Self {
        Self {
            accounts: memory.clone(),
            login_attempts: memory.clone(),
            password_resets: memory.clone(),
            timesheets: memory.clone(),
            audit: memory.clone(),
            notifications: memory.clone(),
        }
    }
}
