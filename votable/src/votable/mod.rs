//! The votable side: casting, removing and tallying votes on one record.
//!
//! Every write runs in a single repository transaction together with the
//! cache column refresh, so a failed cache write leaves no vote behind.
mod args;

pub use args::VoteArgs;

use crate::cacheable::{Tally, update_cached_votes};
use crate::errors::VotingError;
use crate::registry::{DependentStrategy, VotableType};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use votable_repository::{VotesRepository, VotesTransaction};
use votable_shared::types::{
    CacheField, CacheSnapshot, CacheValue, CacheWrite, NewVote, ScopeFilter, VotableRef, Vote, VoteFilter, VoterRef,
};

/// A domain record that can receive votes.
pub trait Votable {
    fn votable_ref(&self) -> VotableRef;

    /// Current values of the record's cache columns, as loaded.
    fn cache_snapshot(&self) -> CacheSnapshot {
        CacheSnapshot::new()
    }

    /// Current value of the record's optimistic lock column.
    fn lock_version(&self) -> i64 {
        0
    }
}

/// Commits `tx` when `result` is `Ok`, otherwise rolls it back and returns the error.
pub(crate) async fn finish<T>(
    tx: Box<dyn VotesTransaction>,
    result: Result<T, VotingError>,
    subject: &(dyn std::fmt::Display + Sync),
) -> Result<T, VotingError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            warn!(subject = %subject, error = %err, "Rolling back vote transaction");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(subject = %subject, error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Keeps positive weights, anything else becomes 1.
fn normalize_weight(weight: Option<i64>) -> i32 {
    match weight {
        Some(weight) if weight > 0 => i32::try_from(weight).unwrap_or(i32::MAX),
        _ => 1,
    }
}

/// Voting view of one votable record.
///
/// Holds the record's cache snapshot and lock version so cached tallies can
/// be served without a query, and keeps both current after every write.
pub struct VotableAggregate {
    repository: Arc<dyn VotesRepository>,
    votable_type: Arc<VotableType>,
    target: VotableRef,
    cache: CacheSnapshot,
    lock_version: i64,
    vote_registered: bool,
}

impl VotableAggregate {
    pub fn new(repository: Arc<dyn VotesRepository>, votable_type: Arc<VotableType>, id: i64) -> Self {
        let target = VotableRef::new(votable_type.kind.clone(), id);
        Self {
            repository,
            votable_type,
            target,
            cache: CacheSnapshot::new(),
            lock_version: 0,
            vote_registered: false,
        }
    }

    pub fn with_cache(mut self, cache: CacheSnapshot) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_lock_version(mut self, lock_version: i64) -> Self {
        self.lock_version = lock_version;
        self
    }

    pub fn target(&self) -> &VotableRef {
        &self.target
    }

    pub fn votable_type(&self) -> &VotableType {
        &self.votable_type
    }

    pub fn cache(&self) -> &CacheSnapshot {
        &self.cache
    }

    pub fn lock_version(&self) -> i64 {
        self.lock_version
    }

    /// Whether the last successful [`cast`](Self::cast) changed a vote.
    pub fn vote_registered(&self) -> bool {
        self.vote_registered
    }

    /// Casts `voter`'s vote on this record.
    ///
    /// Re-voting in the same scope updates the latest existing vote unless
    /// `args.duplicate` is set, in which case another vote row is added.
    ///
    /// Returns `Ok(false)` without touching storage when there is no voter.
    /// [`VotableAggregate::vote_registered`] is cleared before the transaction
    /// opens, so it stays `false` when the cast fails.
    ///
    /// # Errors
    ///
    /// Any storage failure, including a stale cache write, rolls the whole
    /// cast back and is returned as is.
    pub async fn cast(&mut self, voter: Option<&VoterRef>, args: VoteArgs) -> Result<bool, VotingError> {
        let Some(voter) = voter else {
            return Ok(false);
        };
        let flag = args.vote.meaning();
        let weight = normalize_weight(args.weight);
        let scope = args.scope.as_deref();

        self.vote_registered = false;
        let mut tx = self.repository.begin().await?;
        let result = self.cast_in(&mut *tx, voter, flag, weight, scope, args.duplicate).await;
        let (registered, write) = finish(tx, result, &self.target).await?;

        self.vote_registered = registered;
        self.apply_cache_write(write);
        debug!(
            votable = %self.target,
            voter = %voter,
            vote_flag = flag,
            vote_weight = weight,
            vote_scope = scope,
            registered,
            "Vote cast"
        );
        Ok(true)
    }

    async fn cast_in(
        &self,
        tx: &mut dyn VotesTransaction,
        voter: &VoterRef,
        flag: bool,
        weight: i32,
        scope: Option<&str>,
        duplicate: bool,
    ) -> Result<(bool, Option<CacheWrite>), VotingError> {
        let lookup = self.lookup(voter, scope);
        let existing = if duplicate { None } else { tx.last_vote(&lookup).await? };

        let (saved, previous_update) = match existing {
            Some(vote) if vote.vote_flag == flag && vote.vote_weight == weight => {
                let updated_at = vote.updated_at;
                (vote, Some(updated_at))
            }
            Some(vote) => {
                let updated = tx.update_vote(vote.id, flag, weight).await?;
                (updated, Some(vote.updated_at))
            }
            None => {
                let uniqueness_token = if duplicate && tx.vote_exists(&lookup).await? {
                    Uuid::new_v4().to_string()
                } else {
                    String::new()
                };
                let vote = NewVote {
                    votable: self.target.clone(),
                    voter: voter.clone(),
                    vote_flag: flag,
                    vote_scope: scope.map(str::to_owned),
                    vote_weight: weight,
                    uniqueness_token,
                };
                (tx.insert_vote(&vote).await?, None)
            }
        };
        let registered = previous_update != Some(saved.updated_at);

        let write = update_cached_votes(tx, &self.votable_type, &self.target, scope, self.lock_version).await?;
        Ok((registered, write))
    }

    /// Removes every vote `voter` cast on this record in `scope`.
    ///
    /// Clears [`VotableAggregate::vote_registered`] whenever it succeeds.
    ///
    /// Returns `Ok(false)` when there is no voter and `Ok(true)` otherwise,
    /// including when there was nothing to remove.
    pub async fn uncast(&mut self, voter: Option<&VoterRef>, scope: Option<&str>) -> Result<bool, VotingError> {
        let Some(voter) = voter else {
            return Ok(false);
        };

        let mut tx = self.repository.begin().await?;
        let result = self.uncast_in(&mut *tx, voter, scope).await;
        let (removed, write) = finish(tx, result, &self.target).await?;

        self.vote_registered = false;
        self.apply_cache_write(write);
        debug!(votable = %self.target, voter = %voter, vote_scope = scope, removed, "Vote removed");
        Ok(true)
    }

    async fn uncast_in(
        &self,
        tx: &mut dyn VotesTransaction,
        voter: &VoterRef,
        scope: Option<&str>,
    ) -> Result<(u64, Option<CacheWrite>), VotingError> {
        let votes = tx.find_votes(&self.lookup(voter, scope)).await?;
        if votes.is_empty() {
            return Ok((0, None));
        }
        let ids: Vec<i64> = votes.iter().map(|vote| vote.id).collect();
        let removed = tx.delete_votes(&ids).await?;
        let write = update_cached_votes(tx, &self.votable_type, &self.target, scope, self.lock_version).await?;
        Ok((removed, write))
    }

    pub async fn cast_up(
        &mut self,
        voter: Option<&VoterRef>,
        scope: Option<&str>,
        weight: Option<i64>,
    ) -> Result<bool, VotingError> {
        self.cast(voter, VoteArgs::up().scope_opt(scope).weight_opt(weight)).await
    }

    pub async fn cast_down(
        &mut self,
        voter: Option<&VoterRef>,
        scope: Option<&str>,
        weight: Option<i64>,
    ) -> Result<bool, VotingError> {
        self.cast(voter, VoteArgs::down().scope_opt(scope).weight_opt(weight)).await
    }

    /// Removes every vote on this record, as when the record is destroyed.
    ///
    /// Follows the type's dependent strategy: one bulk delete, or one delete
    /// per vote inside a transaction.
    pub async fn destroy_votes_for(&mut self) -> Result<u64, VotingError> {
        let filter = VoteFilter::for_votable(&self.target);
        let removed = match self.votable_type.dependent {
            DependentStrategy::DeleteAll => self.repository.delete_all_votes(&filter).await?,
            DependentStrategy::Destroy => {
                let mut tx = self.repository.begin().await?;
                let result = delete_one_by_one(&mut *tx, &filter).await;
                finish(tx, result, &self.target).await?
            }
        };
        self.vote_registered = false;
        debug!(votable = %self.target, removed, "Votes destroyed with votable");
        Ok(removed)
    }

    /// Votes `voter` cast on this record in exactly `scope`.
    fn lookup(&self, voter: &VoterRef, scope: Option<&str>) -> VoteFilter {
        VoteFilter::for_votable(&self.target)
            .voter(voter)
            .scope(ScopeFilter::exactly(scope))
    }

    fn apply_cache_write(&mut self, write: Option<CacheWrite>) {
        if let Some(write) = write {
            self.cache.apply(&write.updates);
            if write.lock.is_some() {
                self.lock_version += 1;
            }
        }
    }

    fn cached(&self, field: CacheField, scope: Option<&str>) -> Option<CacheValue> {
        if self.votable_type.cache_columns.has(field, scope) {
            self.cache.get(field, scope)
        } else {
            None
        }
    }

    async fn tally(&self, field: CacheField, skip_cache: bool, scope: Option<&str>) -> Result<CacheValue, VotingError> {
        if !skip_cache {
            if let Some(value) = self.cached(field, scope) {
                return Ok(value);
            }
        }
        let mut reader = self.repository.reader().await?;
        let mut tally = Tally::for_target(&mut *reader, &self.target, scope);
        Ok(tally.value(field).await?)
    }

    /// Number of votes on this record.
    ///
    /// Reads the cache column when the type declares it and `skip_cache` is
    /// `false`, otherwise counts the stored votes. A `None` scope covers every
    /// scope.
    pub async fn count_votes_total(&self, skip_cache: bool, scope: Option<&str>) -> Result<i64, VotingError> {
        Ok(self.tally(CacheField::VotesTotal, skip_cache, scope).await?.as_i64())
    }

    /// Number of up votes.
    pub async fn count_votes_up(&self, skip_cache: bool, scope: Option<&str>) -> Result<i64, VotingError> {
        Ok(self.tally(CacheField::VotesUp, skip_cache, scope).await?.as_i64())
    }

    /// Number of down votes.
    pub async fn count_votes_down(&self, skip_cache: bool, scope: Option<&str>) -> Result<i64, VotingError> {
        Ok(self.tally(CacheField::VotesDown, skip_cache, scope).await?.as_i64())
    }

    /// Up votes minus down votes.
    pub async fn count_votes_score(&self, skip_cache: bool, scope: Option<&str>) -> Result<i64, VotingError> {
        Ok(self.tally(CacheField::VotesScore, skip_cache, scope).await?.as_i64())
    }

    /// Sum of all vote weights, down votes included as positive values.
    pub async fn weighted_total(&self, skip_cache: bool, scope: Option<&str>) -> Result<i64, VotingError> {
        Ok(self.tally(CacheField::WeightedTotal, skip_cache, scope).await?.as_i64())
    }

    /// Up weights minus down weights.
    pub async fn weighted_score(&self, skip_cache: bool, scope: Option<&str>) -> Result<i64, VotingError> {
        Ok(self.tally(CacheField::WeightedScore, skip_cache, scope).await?.as_i64())
    }

    /// Weighted score per vote, `0.0` without votes.
    pub async fn weighted_average(&self, skip_cache: bool, scope: Option<&str>) -> Result<f64, VotingError> {
        Ok(self.tally(CacheField::WeightedAverage, skip_cache, scope).await?.as_f64())
    }

    async fn exists(&self, filter: VoteFilter) -> Result<bool, VotingError> {
        let mut reader = self.repository.reader().await?;
        Ok(reader.vote_exists(&filter).await?)
    }

    pub async fn voted_on_by(&self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.exists(VoteFilter::for_votable(&self.target).voter(voter)).await
    }

    pub async fn voted_up_by(&self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.exists(VoteFilter::for_votable(&self.target).voter(voter).up()).await
    }

    pub async fn voted_down_by(&self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.exists(VoteFilter::for_votable(&self.target).voter(voter).down()).await
    }

    async fn votes_where(&self, flag: Option<bool>, scope: Option<&str>) -> Result<Vec<Vote>, VotingError> {
        let filter = VoteFilter::for_votable(&self.target)
            .flag(flag)
            .scope(ScopeFilter::when_present(scope));
        let mut reader = self.repository.reader().await?;
        Ok(reader.find_votes(&filter).await?)
    }

    /// Votes on this record, every scope when `scope` is `None`.
    pub async fn find_votes_for(&self, scope: Option<&str>) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(None, scope).await
    }

    pub async fn get_up_votes(&self, scope: Option<&str>) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(Some(true), scope).await
    }

    pub async fn get_down_votes(&self, scope: Option<&str>) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(Some(false), scope).await
    }

    async fn voters_where(&self, flag: Option<bool>, scope: Option<&str>) -> Result<Vec<VoterRef>, VotingError> {
        let mut voters: Vec<VoterRef> = Vec::new();
        for vote in self.votes_where(flag, scope).await? {
            if !voters.contains(&vote.voter) {
                voters.push(vote.voter);
            }
        }
        Ok(voters)
    }

    /// Distinct voters of this record, in order of their first vote.
    pub async fn voters(&self, scope: Option<&str>) -> Result<Vec<VoterRef>, VotingError> {
        self.voters_where(None, scope).await
    }

    pub async fn up_voters(&self, scope: Option<&str>) -> Result<Vec<VoterRef>, VotingError> {
        self.voters_where(Some(true), scope).await
    }

    pub async fn down_voters(&self, scope: Option<&str>) -> Result<Vec<VoterRef>, VotingError> {
        self.voters_where(Some(false), scope).await
    }
}

/// Deletes the matching votes one row at a time.
pub(crate) async fn delete_one_by_one(tx: &mut dyn VotesTransaction, filter: &VoteFilter) -> Result<u64, VotingError> {
    let mut removed = 0;
    for vote in tx.find_votes(filter).await? {
        removed += tx.delete_votes(&[vote.id]).await?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weight() {
        assert_eq!(normalize_weight(None), 1);
        assert_eq!(normalize_weight(Some(0)), 1);
        assert_eq!(normalize_weight(Some(-4)), 1);
        assert_eq!(normalize_weight(Some(5)), 5);
        assert_eq!(normalize_weight(Some(i64::MAX)), i32::MAX);
    }
}
