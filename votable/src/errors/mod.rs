//! Error types for the voting core.
//! Registration problems are reported as [`ConfigurationError`]; everything
//! that can go wrong while voting is folded into [`VotingError`].
use votable_repository::RepositoryError;
use votable_shared::types::RecordKind;

/// Problems detected while registering types or reading the environment.
///
/// These are raised eagerly so a misconfigured type fails before its first vote.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Unknown cacheable strategy `{0}`, expected `update`, `update_attributes` or `update_columns`")]
    UnknownCacheableStrategy(String),

    #[error("Unknown dependent strategy `{0}`, expected `destroy` or `delete_all`")]
    UnknownDependentStrategy(String),

    #[error("Invalid {field} `{value}`: only ASCII letters, digits and underscores are allowed")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("{0} is already registered")]
    AlreadyRegistered(RecordKind),

    #[error("{0} must be set")]
    MissingEnv(&'static str),

    #[error("Invalid value `{value}` for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{kind} is not registered as a {capability}")]
    UnregisteredType { capability: &'static str, kind: RecordKind },
}

impl VotingError {
    /// True when a cache write lost an optimistic locking race.
    pub fn is_stale(&self) -> bool {
        matches!(self, VotingError::Repository(err) if err.is_stale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_stale_only_for_stale_records() {
        let stale = VotingError::from(RepositoryError::StaleRecord("Post#1".to_string()));
        let missing = VotingError::from(RepositoryError::RecordNotFound("Post#1".to_string()));

        assert!(stale.is_stale());
        assert!(!missing.is_stale());
    }

    #[test]
    fn test_messages_name_the_offending_value() {
        let err = ConfigurationError::UnknownCacheableStrategy("save".to_string());
        assert!(err.to_string().contains("`save`"));

        let err = VotingError::UnregisteredType {
            capability: "votable",
            kind: RecordKind::from("Comment"),
        };
        assert_eq!(err.to_string(), "Comment is not registered as a votable");
    }
}
