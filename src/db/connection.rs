use super::DbPool;
use anyhow::{Result, anyhow};
use diesel::PgConnection;
use diesel::r2d2::ConnectionManager;
use std::time::Duration;

/// Construit le pool r2d2. `build` ouvre les connexions tout de suite, donc une
/// base injoignable échoue ici plutôt qu'à la première requête.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);

    diesel::r2d2::Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(Duration::from_secs(10))
        .build(manager)
        .map_err(|e| anyhow!("Failed to create database pool: {}", e))
}

/// Pool against the database named by `DATABASE_URL`, for `#[ignore]`d
/// repository tests.
#[cfg(test)]
pub fn test_pool() -> DbPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    create_pool(&database_url, 2).expect("Failed to create test pool")
}
