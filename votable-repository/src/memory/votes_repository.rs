use crate::{RepositoryError, VoteQueries, VotesRepository, VotesTransaction};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use votable_shared::types::{
    CacheSnapshot, CacheWrite, NewVote, RankOrder, RankedVotable, RecordKind, VotableRef, Vote, VoteFilter,
};

/// The stored side of a votable record: its cache columns and bookkeeping
/// that a full-record save touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordState {
    pub cache: CacheSnapshot,
    pub lock_version: i64,
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of successful cache writes.
    pub saves: u64,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    votes: Vec<Vote>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
    records: HashMap<VotableRef, RecordState>,
    tables: HashMap<String, Vec<String>>,
}

impl MemoryState {
    /// Wall clock time, nudged forward so consecutive writes never share a timestamp.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }

    fn find_votes(&self, filter: &VoteFilter) -> Vec<Vote> {
        self.votes.iter().filter(|vote| filter.matches(vote)).cloned().collect()
    }

    fn last_vote(&self, filter: &VoteFilter) -> Option<Vote> {
        self.votes.iter().rev().find(|vote| filter.matches(vote)).cloned()
    }

    fn count_votes(&self, filter: &VoteFilter) -> i64 {
        self.votes.iter().filter(|vote| filter.matches(vote)).count() as i64
    }

    fn sum_weights(&self, filter: &VoteFilter) -> i64 {
        self.votes
            .iter()
            .filter(|vote| filter.matches(vote))
            .map(|vote| i64::from(vote.vote_weight))
            .sum()
    }

    fn vote_exists(&self, filter: &VoteFilter) -> bool {
        self.votes.iter().any(|vote| filter.matches(vote))
    }

    fn insert_vote(&mut self, new_vote: &NewVote) -> Result<Vote, RepositoryError> {
        let scope_key = new_vote.vote_scope.as_deref().unwrap_or("");
        let taken = self.votes.iter().any(|vote| {
            vote.voter == new_vote.voter
                && vote.votable == new_vote.votable
                && vote.vote_scope.as_deref().unwrap_or("") == scope_key
                && vote.uniqueness_token == new_vote.uniqueness_token
        });
        if taken {
            return Err(RepositoryError::DuplicateVote(format!(
                "{} already voted on {} in scope {:?}",
                new_vote.voter, new_vote.votable, new_vote.vote_scope
            )));
        }

        self.next_id += 1;
        let timestamp = self.next_timestamp();
        let vote = Vote {
            id: self.next_id,
            votable: new_vote.votable.clone(),
            voter: new_vote.voter.clone(),
            vote_flag: new_vote.vote_flag,
            vote_scope: new_vote.vote_scope.clone(),
            vote_weight: new_vote.vote_weight,
            uniqueness_token: new_vote.uniqueness_token.clone(),
            created_at: timestamp,
            updated_at: timestamp,
        };
        self.votes.push(vote.clone());
        Ok(vote)
    }

    fn update_vote(&mut self, id: i64, vote_flag: bool, vote_weight: i32) -> Result<Vote, RepositoryError> {
        let timestamp = self.next_timestamp();
        let vote = self
            .votes
            .iter_mut()
            .find(|vote| vote.id == id)
            .ok_or_else(|| RepositoryError::RecordNotFound(format!("vote {id}")))?;
        vote.vote_flag = vote_flag;
        vote.vote_weight = vote_weight;
        vote.updated_at = timestamp;
        Ok(vote.clone())
    }

    fn delete_where(&mut self, keep: impl Fn(&Vote) -> bool) -> u64 {
        let before = self.votes.len();
        self.votes.retain(|vote| keep(vote));
        (before - self.votes.len()) as u64
    }

    fn write_cache(&mut self, write: &CacheWrite) -> Result<(), RepositoryError> {
        if write.updates.is_empty() {
            return Ok(());
        }
        let touched_at = write.touch_column.as_ref().map(|_| self.next_timestamp());
        let Some(record) = self.records.get_mut(&write.target) else {
            return Err(match write.lock {
                Some(_) => RepositoryError::StaleRecord(write.target.to_string()),
                None => RepositoryError::RecordNotFound(format!("{} in {}", write.target, write.table)),
            });
        };
        if let Some(lock) = &write.lock {
            if record.lock_version != lock.expected {
                return Err(RepositoryError::StaleRecord(format!(
                    "{} (expected {} = {}, found {})",
                    write.target, lock.column, lock.expected, record.lock_version
                )));
            }
            record.lock_version += 1;
        }
        record.cache.apply(&write.updates);
        if touched_at.is_some() {
            record.updated_at = touched_at;
        }
        record.saves += 1;
        Ok(())
    }

    fn rank_votables(&self, kind: &RecordKind, order: RankOrder, limit: i64) -> Vec<RankedVotable> {
        let mut tallies: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
        for vote in self.votes.iter().filter(|vote| vote.votable.kind() == kind) {
            let (votes, score) = tallies.entry(vote.votable.id()).or_default();
            *votes += 1;
            *score += if vote.vote_flag { 1 } else { -1 };
        }

        let mut ranked: Vec<RankedVotable> = tallies
            .into_iter()
            .map(|(id, (votes, score))| RankedVotable {
                votable: VotableRef::new(kind.clone(), id),
                score,
                votes,
            })
            .collect();
        ranked.sort_by(|a, b| {
            let by_score = match order {
                RankOrder::Best => b.score.cmp(&a.score),
                RankOrder::Worst => a.score.cmp(&b.score),
            };
            by_score.then(a.votable.id().cmp(&b.votable.id()))
        });
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        ranked
    }
}

/// Vote store kept entirely in process memory.
///
/// Votable records must be registered with [`InMemoryVotesRepository::insert_record`]
/// before their cache columns can be written, mirroring an `UPDATE` that
/// matches no row.
#[derive(Clone, Default)]
pub struct InMemoryVotesRepository {
    state: Arc<Mutex<MemoryState>>,
    fail_next_cache_write: Arc<AtomicBool>,
}

impl InMemoryVotesRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a votable record with empty cache columns.
    pub async fn insert_record(&self, target: &VotableRef) {
        self.insert_record_with(target, RecordState::default()).await;
    }

    pub async fn insert_record_with(&self, target: &VotableRef, record: RecordState) {
        self.state.lock().await.records.insert(target.clone(), record);
    }

    pub async fn record(&self, target: &VotableRef) -> Option<RecordState> {
        self.state.lock().await.records.get(target).cloned()
    }

    /// Declares the columns reported for `table` by [`VotesRepository::table_columns`].
    pub async fn define_table<I, S>(&self, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.state.lock().await.tables.insert(table.to_owned(), columns);
    }

    /// Every stored vote, oldest first.
    pub async fn all_votes(&self) -> Vec<Vote> {
        self.state.lock().await.votes.clone()
    }

    /// Makes the next cache write fail as if the record's lock were stale.
    pub fn fail_next_cache_write(&self) {
        self.fail_next_cache_write.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VotesRepository for InMemoryVotesRepository {
    async fn begin(&self) -> Result<Box<dyn VotesTransaction>, RepositoryError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryVotesTransaction {
            guard,
            working,
            fail_next_cache_write: self.fail_next_cache_write.clone(),
        }))
    }

    async fn reader(&self) -> Result<Box<dyn VoteQueries>, RepositoryError> {
        Ok(Box::new(InMemoryVoteReader {
            state: self.state.clone(),
        }))
    }

    async fn delete_all_votes(&self, filter: &VoteFilter) -> Result<u64, RepositoryError> {
        Ok(self.state.lock().await.delete_where(|vote| !filter.matches(vote)))
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self.state.lock().await.tables.get(table).cloned().unwrap_or_default())
    }

    async fn rank_votables(
        &self,
        kind: &RecordKind,
        order: RankOrder,
        limit: i64,
    ) -> Result<Vec<RankedVotable>, RepositoryError> {
        Ok(self.state.lock().await.rank_votables(kind, order, limit))
    }
}

/// Read-only view that locks the shared state per query.
pub struct InMemoryVoteReader {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl VoteQueries for InMemoryVoteReader {
    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>, RepositoryError> {
        Ok(self.state.lock().await.find_votes(filter))
    }

    async fn last_vote(&mut self, filter: &VoteFilter) -> Result<Option<Vote>, RepositoryError> {
        Ok(self.state.lock().await.last_vote(filter))
    }

    async fn count_votes(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        Ok(self.state.lock().await.count_votes(filter))
    }

    async fn sum_weights(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        Ok(self.state.lock().await.sum_weights(filter))
    }

    async fn vote_exists(&mut self, filter: &VoteFilter) -> Result<bool, RepositoryError> {
        Ok(self.state.lock().await.vote_exists(filter))
    }
}

/// Exclusive transaction over a working copy of the store.
pub struct InMemoryVotesTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_next_cache_write: Arc<AtomicBool>,
}

#[async_trait]
impl VoteQueries for InMemoryVotesTransaction {
    async fn find_votes(&mut self, filter: &VoteFilter) -> Result<Vec<Vote>, RepositoryError> {
        Ok(self.working.find_votes(filter))
    }

    async fn last_vote(&mut self, filter: &VoteFilter) -> Result<Option<Vote>, RepositoryError> {
        Ok(self.working.last_vote(filter))
    }

    async fn count_votes(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        Ok(self.working.count_votes(filter))
    }

    async fn sum_weights(&mut self, filter: &VoteFilter) -> Result<i64, RepositoryError> {
        Ok(self.working.sum_weights(filter))
    }

    async fn vote_exists(&mut self, filter: &VoteFilter) -> Result<bool, RepositoryError> {
        Ok(self.working.vote_exists(filter))
    }
}

#[async_trait]
impl VotesTransaction for InMemoryVotesTransaction {
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, RepositoryError> {
        self.working.insert_vote(vote)
    }

    async fn update_vote(&mut self, id: i64, vote_flag: bool, vote_weight: i32) -> Result<Vote, RepositoryError> {
        self.working.update_vote(id, vote_flag, vote_weight)
    }

    async fn delete_votes(&mut self, ids: &[i64]) -> Result<u64, RepositoryError> {
        Ok(self.working.delete_where(|vote| !ids.contains(&vote.id)))
    }

    async fn write_cache(&mut self, write: &CacheWrite) -> Result<(), RepositoryError> {
        if !write.updates.is_empty() && self.fail_next_cache_write.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::StaleRecord(format!(
                "{} was modified concurrently",
                write.target
            )));
        }
        self.working.write_cache(write)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryVotesTransaction { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}
