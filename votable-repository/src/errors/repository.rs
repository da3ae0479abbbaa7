//! Error types for vote storage.
//! Defines the errors that can occur while reading or writing votes and the
//! cache columns of votable records.
use thiserror::Error;

/// Represents errors that can occur within the votes repository.
///
/// Every variant aborts the surrounding transaction; none of them is retried
/// by the repository itself.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// The optimistic lock on a votable record no longer matches.
    #[error("Stale record: {0}")]
    StaleRecord(String),

    /// The unique index on (voter, votable, scope) rejected an insert.
    #[error("Duplicate vote: {0}")]
    DuplicateVote(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl RepositoryError {
    pub fn is_stale(&self) -> bool {
        matches!(self, RepositoryError::StaleRecord(_))
    }
}
