//! PostgreSQL implementation of the votes repository.
//!
//! Provides a PostgreSQL backend for the [`VotesRepository`] trait with
//! connection pooling and transaction safety.
//!
//! ## Key Features
//!
//! - Connection pooling with `sqlx::PgPool`
//! - ACID transactions with automatic rollback on drop
//! - Dynamic filters built with `QueryBuilder`
//! - A unique index enforcing one vote per (voter, votable, scope)
use super::queries;
use crate::{RepositoryError, VoteQueries, VotesRepository, VotesTransaction};
use async_trait::async_trait;
use sqlx::Postgres;
use sqlx::pool::PoolConnection;
use tracing::debug;
use votable_shared::types::{CacheWrite, NewVote, RankOrder, RankedVotable, RecordKind, Vote, VoteFilter};

/// PostgreSQL implementation of the votes repository.
#[derive(Clone)]
pub struct PostgresVotesRepository {
    pool: sqlx::PgPool,
}

impl PostgresVotesRepository {
    /// Creates a new PostgreSQL repository instance.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresVotesRepository)` - Ready-to-use repository instance
    /// * `Err(RepositoryError)` - Future validation errors (currently always succeeds)
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, RepositoryError> {
        Ok(Self { pool })
    }

    /// Runs the embedded migrations that create the `votes` table.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        super::MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait]
impl VotesRepository for PostgresVotesRepository {
    async fn begin(&self) -> Result<Box<dyn VotesTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresVotesTransaction { tx }))
    }

    async fn reader(&self) -> Result<Box<dyn VoteQueries>, RepositoryError> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PostgresVoteReader { conn }))
    }

    async fn delete_all_votes(&self, filter: &VoteFilter) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = queries::delete_matching(&mut conn, filter).await?;
        debug!(deleted, "Deleted votes in bulk");
        Ok(deleted)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        queries::table_columns(&mut conn, table).await
    }

    async fn rank_votables(
        &self,
        kind: &RecordKind,
        order: RankOrder,
        limit: i64,
    ) -> Result<Vec<RankedVotable>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        queries::rank_votables(&mut conn, kind, order, limit).await
    }
}

/// A pooled connection used for read-only vote queries.
pub struct PostgresVoteReader {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl VoteQueries for PostgresVoteReader {
    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>, RepositoryError> {
        queries::find_votes(&mut self.conn, filter).await
    }

    async fn last_vote(&mut self, filter: &VoteFilter) -> Result<Option<Vote>, RepositoryError> {
        queries::last_vote(&mut self.conn, filter).await
    }

    async fn count_votes(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        queries::count_votes(&mut self.conn, filter).await
    }

    async fn sum_weights(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        queries::sum_weights(&mut self.conn, filter).await
    }

    async fn vote_exists(&mut self, filter: &VoteFilter) -> Result<bool, RepositoryError> {
        queries::vote_exists(&mut self.conn, filter).await
    }
}

/// An open PostgreSQL transaction. Rolled back when dropped uncommitted.
pub struct PostgresVotesTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl VoteQueries for PostgresVotesTransaction {
    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>, RepositoryError> {
        queries::find_votes(&mut self.tx, filter).await
    }

    async fn last_vote(&mut self, filter: &VoteFilter) -> Result<Option<Vote>, RepositoryError> {
        queries::last_vote(&mut self.tx, filter).await
    }

    async fn count_votes(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        queries::count_votes(&mut self.tx, filter).await
    }

    async fn sum_weights(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        queries::sum_weights(&mut self.tx, filter).await
    }

    async fn vote_exists(&mut self, filter: &VoteFilter) -> Result<bool, RepositoryError> {
        queries::vote_exists(&mut self.tx, filter).await
    }
}

#[async_trait]
impl VotesTransaction for PostgresVotesTransaction {
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, RepositoryError> {
        queries::insert_vote(&mut self.tx, vote).await
    }

    async fn update_vote(&mut self, id: i64, vote_flag: bool, vote_weight: i32) -> Result<Vote, RepositoryError> {
        queries::update_vote(&mut self.tx, id, vote_flag, vote_weight).await
    }

    async fn delete_votes(&mut self, ids: &[i64]) -> Result<u64, RepositoryError> {
        queries::delete_votes(&mut self.tx, ids).await
    }

    async fn write_cache(&mut self, write: &CacheWrite) -> Result<(), RepositoryError> {
        queries::write_cache(&mut self.tx, write).await?;
        debug!(votable = %write.target, columns = write.updates.len(), "Cache columns written");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let PostgresVotesTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        let PostgresVotesTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
