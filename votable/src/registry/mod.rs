//! Registry of the record kinds that take part in voting.
//!
//! Votable kinds are registered with [`VotableOptions`], which are validated
//! and resolved into a [`VotableType`] once. Voter kinds need no options.
mod options;

pub use options::{CacheableStrategy, DependentStrategy, VotableOptions, VotableType};

use crate::errors::{ConfigurationError, VotingError};
use crate::votable::{Votable, VotableAggregate};
use crate::voter::{Voter, VoterAggregate};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;
use votable_repository::VotesRepository;
use votable_shared::types::{CacheColumns, RecordKind};

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    votables: HashMap<RecordKind, Arc<VotableType>>,
    voters: HashSet<RecordKind>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a votable kind.
    ///
    /// # Errors
    ///
    /// Fails with a `ConfigurationError` when a strategy is unknown, an
    /// identifier is malformed, or the kind is already registered.
    pub fn register_votable(&mut self, options: VotableOptions) -> Result<Arc<VotableType>, ConfigurationError> {
        if self.votables.contains_key(&options.kind) {
            return Err(ConfigurationError::AlreadyRegistered(options.kind));
        }
        let votable_type = Arc::new(VotableType::try_from(options)?);
        info!(
            kind = %votable_type.kind,
            table = %votable_type.table,
            cacheable_strategy = %votable_type.cacheable_strategy,
            cache_columns = votable_type.cache_columns.column_names().len(),
            "Registered votable type"
        );
        self.votables.insert(votable_type.kind.clone(), votable_type.clone());
        Ok(votable_type)
    }

    /// Registers a votable kind, discovering its cache columns from the table.
    ///
    /// Explicit cache columns in `options` are replaced by what the table
    /// actually has. A `lock_version` or `updated_at` column is picked up as
    /// the lock or timestamp column unless one was given.
    pub async fn register_votable_from_table(
        &mut self,
        repository: &dyn VotesRepository,
        mut options: VotableOptions,
    ) -> Result<Arc<VotableType>, VotingError> {
        let columns = repository.table_columns(&options.table).await?;
        options.cache_columns = CacheColumns::from_column_names(&columns);
        if options.lock_column.is_none() && columns.iter().any(|column| column == "lock_version") {
            options.lock_column = Some("lock_version".to_string());
        }
        if options.timestamp_column.is_none() && columns.iter().any(|column| column == "updated_at") {
            options.timestamp_column = Some("updated_at".to_string());
        }
        Ok(self.register_votable(options)?)
    }

    pub fn register_voter(&mut self, kind: impl Into<RecordKind>) -> Result<(), ConfigurationError> {
        let kind = kind.into();
        if !self.voters.insert(kind.clone()) {
            return Err(ConfigurationError::AlreadyRegistered(kind));
        }
        info!(kind = %kind, "Registered voter type");
        Ok(())
    }

    pub fn is_votable(&self, kind: &RecordKind) -> bool {
        self.votables.contains_key(kind)
    }

    pub fn is_voter(&self, kind: &RecordKind) -> bool {
        self.voters.contains(kind)
    }

    pub fn votable_type(&self, kind: &RecordKind) -> Result<Arc<VotableType>, VotingError> {
        self.votables
            .get(kind)
            .cloned()
            .ok_or_else(|| VotingError::UnregisteredType {
                capability: "votable",
                kind: kind.clone(),
            })
    }

    /// Builds the voting view of a votable record from its current state.
    pub fn votable<T: Votable + ?Sized>(
        &self,
        repository: Arc<dyn VotesRepository>,
        record: &T,
    ) -> Result<VotableAggregate, VotingError> {
        let target = record.votable_ref();
        let votable_type = self.votable_type(target.kind())?;
        Ok(VotableAggregate::new(repository, votable_type, target.id())
            .with_cache(record.cache_snapshot())
            .with_lock_version(record.lock_version()))
    }

    pub fn voter<T: Voter + ?Sized>(
        &self,
        repository: Arc<dyn VotesRepository>,
        record: &T,
    ) -> Result<VoterAggregate, VotingError> {
        let voter = record.voter_ref();
        if !self.is_voter(voter.kind()) {
            return Err(VotingError::UnregisteredType {
                capability: "voter",
                kind: voter.kind().clone(),
            });
        }
        Ok(VoterAggregate::new(repository, voter))
    }
}
