//! This module defines the storage contract of the voting core: read queries
//! over the `votes` table, write access inside a transaction, and the
//! repository that hands both out.
use crate::errors::RepositoryError;
use votable_shared::types::{CacheWrite, NewVote, RankOrder, RankedVotable, RecordKind, Vote, VoteFilter};

/// Read queries over the `votes` table.
///
/// Implemented both by plain connections and by open transactions, so the
/// aggregation code reads through whichever one it is handed.
#[async_trait::async_trait]
pub trait VoteQueries: Send {
    /// Returns the votes matching `filter`, oldest first (by id).
    ///
    /// # Arguments
    ///
    /// * `filter` - The vote conditions to match.
    ///
    /// # Returns
    ///
    /// A `Result` with the matching votes or a `RepositoryError` if the query fails.
    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>, RepositoryError>;

    /// Returns the most recently created vote matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `filter` - The vote conditions to match.
    ///
    /// # Returns
    ///
    /// A `Result` with the vote, `None` when nothing matches, or a
    /// `RepositoryError` if the query fails.
    async fn last_vote(&mut self, filter: &VoteFilter) -> Result<Option<Vote>, RepositoryError>;

    /// Counts the votes matching `filter`.
    ///
    /// # Arguments
    ///
    /// * `filter` - The vote conditions to match.
    ///
    /// # Returns
    ///
    /// A `Result` with the row count or a `RepositoryError` if the query fails.
    async fn count_votes(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError>;

    /// Sums `vote_weight` over the matching votes, `0` when none match.
    async fn sum_weights(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError>;

    /// Existence check that stops at the first matching row.
    async fn vote_exists(&mut self, filter: &VoteFilter) -> Result<bool, RepositoryError>;
}

/// An open all-or-nothing unit of work.
///
/// Dropping a transaction without calling [`VotesTransaction::commit`]
/// discards every write made through it.
#[async_trait::async_trait]
pub trait VotesTransaction: VoteQueries {
    /// Inserts a vote.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DuplicateVote` when the unique index on
    /// (voter, votable, scope, uniqueness token) rejects the row.
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, RepositoryError>;

    /// Rewrites the flag and weight of a vote and bumps its `updated_at`.
    async fn update_vote(&mut self, id: i64, vote_flag: bool, vote_weight: i32) -> Result<Vote, RepositoryError>;

    /// Deletes the given votes, returning how many rows went away.
    async fn delete_votes(&mut self, ids: &[i64]) -> Result<u64, RepositoryError>;

    /// Writes one batch of cache columns onto a votable record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::StaleRecord` when the batch carries an
    /// optimistic lock that no longer matches, and
    /// `RepositoryError::RecordNotFound` when the record does not exist.
    async fn write_cache(&mut self, write: &CacheWrite) -> Result<(), RepositoryError>;

    /// Makes every write of this transaction durable.
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or a `RepositoryError` if the commit fails,
    /// in which case nothing was written.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    /// Discards every write of this transaction.
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or a `RepositoryError` if the rollback fails.
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// A trait that defines the interface for interacting with the vote store.
#[async_trait::async_trait]
pub trait VotesRepository: Send + Sync {
    /// Opens a transaction.
    ///
    /// # Returns
    ///
    /// A `Result` with the open transaction or a `RepositoryError` if no
    /// connection could be acquired.
    async fn begin(&self) -> Result<Box<dyn VotesTransaction>, RepositoryError>;

    /// Acquires a connection for read-only queries.
    async fn reader(&self) -> Result<Box<dyn VoteQueries>, RepositoryError>;

    /// Deletes every matching vote in one statement.
    ///
    /// # Arguments
    ///
    /// * `filter` - The vote conditions to match.
    ///
    /// # Returns
    ///
    /// A `Result` with the number of deleted rows or a `RepositoryError` if the
    /// delete fails.
    async fn delete_all_votes(&self, filter: &VoteFilter) -> Result<u64, RepositoryError>;

    /// Lists the column names of a table, empty when the table is unknown.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, RepositoryError>;

    /// Ranks the voted-on records of one kind by net unweighted score.
    ///
    /// Ties are broken by ascending record id.
    ///
    /// # Arguments
    ///
    /// * `kind` - The votable type to rank.
    /// * `order` - Highest or lowest score first.
    /// * `limit` - The maximum number of records to return. Negative ranks nothing.
    ///
    /// # Returns
    ///
    /// A `Result` with the ranked records or a `RepositoryError` if the query fails.
    async fn rank_votables(
        &self,
        kind: &RecordKind,
        order: RankOrder,
        limit: i64,
    ) -> Result<Vec<RankedVotable>, RepositoryError>;
}
