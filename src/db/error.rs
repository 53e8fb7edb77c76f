use std::fmt;

/// Repository layer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    PoolError(String),
    NotFound(String),
    UniqueViolation(String),
    ForeignKeyViolation(String),
    /// The row changed since it was read (optimistic concurrency check failed).
    StaleWrite(String),
    DatabaseError(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::PoolError(msg) => write!(f, "Connection pool error: {msg}"),
            RepositoryError::NotFound(msg) => write!(f, "Not found: {msg}"),
            RepositoryError::UniqueViolation(msg) => {
                write!(f, "Unique constraint violation: {msg}")
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                write!(f, "Foreign key constraint violation: {msg}")
            }
            RepositoryError::StaleWrite(msg) => write!(f, "Concurrent modification: {msg}"),
            RepositoryError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => RepositoryError::NotFound("Record not found".to_string()),
            Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                match kind {
                    DatabaseErrorKind::UniqueViolation => RepositoryError::UniqueViolation(message),
                    DatabaseErrorKind::ForeignKeyViolation => {
                        RepositoryError::ForeignKeyViolation(message)
                    }
                    DatabaseErrorKind::SerializationFailure => {
                        RepositoryError::StaleWrite(message)
                    }
                    _ => RepositoryError::DatabaseError(message),
                }
            }
            _ => RepositoryError::DatabaseError(err.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::PoolError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let err = RepositoryError::from(diesel::result::Error::NotFound);
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn display_prefixes_kind() {
        let err = RepositoryError::StaleWrite("timesheet 1".to_string());
        assert_eq!(err.to_string(), "Concurrent modification: timesheet 1");
    }
}
