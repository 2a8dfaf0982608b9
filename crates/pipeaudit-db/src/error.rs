//! Error types for the pipeaudit-db crate.

use thiserror::Error;

/// Database operation errors.
///
/// ```rust
/// use pipeaudit_db::DbError;
///
/// fn describe(err: &DbError) -> &'static str {
///     match err {
///         DbError::ConnectionFailed(_) => "connection",
///         DbError::MigrationFailed(_) => "migration",
///         DbError::QueryFailed(_) => "query",
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    /// Check if this error indicates a migration problem.
    #[must_use]
    pub fn is_migration_error(&self) -> bool {
        matches!(self, DbError::MigrationFailed(_))
    }

    /// Check if this error indicates a query problem.
    #[must_use]
    pub fn is_query_error(&self) -> bool {
        matches!(self, DbError::QueryFailed(_))
    }
}

impl From<sqlx::Error> for DbError {
    /// Pool and I/O failures are connection problems, everything else is a
    /// failed query.
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DbError::ConnectionFailed(err),
            other => DbError::QueryFailed(other),
        }
    }
}
