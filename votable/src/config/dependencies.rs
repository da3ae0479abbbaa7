use crate::config::VotingConfig;
use crate::errors::VotingError;
use crate::registry::{TypeRegistry, VotableOptions, VotableType};
use crate::votable::{Votable, VotableAggregate};
use crate::voter::{Voter, VoterAggregate};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use votable_repository::{PostgresVotesRepository, VotesRepository};

/// `Dependencies` holds the vote store and the registry of voting types.
pub struct Dependencies {
    pub repository: Arc<dyn VotesRepository>,
    pub registry: TypeRegistry,
}

impl Dependencies {
    /// Connects to PostgreSQL and, unless disabled, runs the embedded migrations.
    ///
    /// # Returns
    ///
    /// A `Result` which is `Ok(Self)` with an empty registry, or a
    /// `VotingError` if the pool cannot connect or a migration fails.
    pub async fn new(config: &VotingConfig) -> Result<Self, VotingError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        let repository = PostgresVotesRepository::new(pool).await?;
        if config.run_migrations {
            repository.migrate().await?;
        }
        info!(max_connections = config.max_connections, "Voting dependencies initialized");

        Ok(Self::with_repository(Arc::new(repository)))
    }

    /// Uses an existing vote store, e.g. the in-memory one.
    pub fn with_repository(repository: Arc<dyn VotesRepository>) -> Self {
        Self {
            repository,
            registry: TypeRegistry::new(),
        }
    }

    /// Registers a votable type using the cache columns its table has.
    pub async fn register_votable_from_table(
        &mut self,
        options: VotableOptions,
    ) -> Result<Arc<VotableType>, VotingError> {
        self.registry
            .register_votable_from_table(self.repository.as_ref(), options)
            .await
    }

    pub fn votable<T: Votable + ?Sized>(&self, record: &T) -> Result<VotableAggregate, VotingError> {
        self.registry.votable(self.repository.clone(), record)
    }

    pub fn voter<T: Voter + ?Sized>(&self, record: &T) -> Result<VoterAggregate, VotingError> {
        self.registry.voter(self.repository.clone(), record)
    }
}
