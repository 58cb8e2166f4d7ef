use error_common::codes;
use logger_redacted::redact;
use plugins_registry_api::RepositoryError;
use thiserror::Error;

/// Postgres error code for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    /// A stored column could not be mapped onto a registry type
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl DatabaseError {
    pub fn code(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => codes::database::CONNECTION_FAILED,
            _ => codes::database::QUERY_FAILED,
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(e.to_string())
    }
}

impl From<DatabaseError> for RepositoryError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::SqlxError(inner) => repository_error(inner),
            other => RepositoryError::Backend(redact(&other.to_string())),
        }
    }
}

/// Map a driver error onto the repository contract
///
/// Unique violations keep the constraint name and a dangling foreign key is a
/// missing parent. Everything else is a backend failure with credentials
/// scrubbed from the message.
pub fn repository_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            RepositoryError::UniqueViolation(
                db.constraint().unwrap_or("unique constraint").to_string(),
            )
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
            RepositoryError::NotFound(
                db.constraint().unwrap_or("referenced row").to_string(),
            )
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound("row".to_string()),
        _ => RepositoryError::Backend(redact(&e.to_string())),
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
