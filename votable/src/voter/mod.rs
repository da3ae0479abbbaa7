//! The voter side: votes seen from the record that cast them.
use crate::errors::VotingError;
use crate::votable::{VotableAggregate, VoteArgs, delete_one_by_one, finish};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use votable_repository::VotesRepository;
use votable_shared::types::{RecordKind, ScopeFilter, VotableRef, Vote, VoteFilter, VoterRef};

/// A domain record that can cast votes.
pub trait Voter {
    fn voter_ref(&self) -> VoterRef;
}

/// Loads votable records by kind and id.
///
/// Called once per kind with every id of that kind, so implementations can
/// load a whole batch in one query.
#[async_trait]
pub trait VotableResolver: Send + Sync {
    type Item: Send;

    async fn resolve(&self, kind: &RecordKind, ids: &[i64]) -> Result<Vec<Self::Item>, VotingError>;
}

pub struct VoterAggregate {
    repository: Arc<dyn VotesRepository>,
    voter: VoterRef,
}

impl VoterAggregate {
    pub fn new(repository: Arc<dyn VotesRepository>, voter: VoterRef) -> Self {
        Self { repository, voter }
    }

    pub fn voter(&self) -> &VoterRef {
        &self.voter
    }

    /// Casts a vote on `votable` as this voter.
    pub async fn vote(&self, votable: &mut VotableAggregate, args: VoteArgs) -> Result<bool, VotingError> {
        votable.cast(Some(&self.voter), args).await
    }

    pub async fn vote_up_for(
        &self,
        votable: &mut VotableAggregate,
        scope: Option<&str>,
        weight: Option<i64>,
    ) -> Result<bool, VotingError> {
        votable.cast_up(Some(&self.voter), scope, weight).await
    }

    pub async fn vote_down_for(
        &self,
        votable: &mut VotableAggregate,
        scope: Option<&str>,
        weight: Option<i64>,
    ) -> Result<bool, VotingError> {
        votable.cast_down(Some(&self.voter), scope, weight).await
    }

    pub async fn unvote_for(&self, votable: &mut VotableAggregate, scope: Option<&str>) -> Result<bool, VotingError> {
        votable.uncast(Some(&self.voter), scope).await
    }

    /// This voter's votes on `votable` in exactly `scope`.
    fn votes_on(&self, votable: &VotableRef, scope: Option<&str>) -> VoteFilter {
        VoteFilter::by_voter(&self.voter)
            .votable(votable)
            .scope(ScopeFilter::exactly(scope))
    }

    async fn exists(&self, filter: VoteFilter) -> Result<bool, VotingError> {
        let mut reader = self.repository.reader().await?;
        Ok(reader.vote_exists(&filter).await?)
    }

    pub async fn voted_on(&self, votable: &VotableRef, scope: Option<&str>) -> Result<bool, VotingError> {
        self.exists(self.votes_on(votable, scope)).await
    }

    pub async fn voted_up_on(&self, votable: &VotableRef, scope: Option<&str>) -> Result<bool, VotingError> {
        self.exists(self.votes_on(votable, scope).up()).await
    }

    pub async fn voted_down_on(&self, votable: &VotableRef, scope: Option<&str>) -> Result<bool, VotingError> {
        self.exists(self.votes_on(votable, scope).down()).await
    }

    /// Flag of the latest vote on `votable`, `None` when there is none.
    pub async fn voted_as_when_voting_on(
        &self,
        votable: &VotableRef,
        scope: Option<&str>,
    ) -> Result<Option<bool>, VotingError> {
        let mut reader = self.repository.reader().await?;
        let last = reader.last_vote(&self.votes_on(votable, scope)).await?;
        Ok(last.map(|vote| vote.vote_flag))
    }

    async fn votes_where(&self, filter: VoteFilter) -> Result<Vec<Vote>, VotingError> {
        let mut reader = self.repository.reader().await?;
        Ok(reader.find_votes(&filter).await?)
    }

    /// Votes cast by this voter, oldest first.
    ///
    /// # Arguments
    ///
    /// * `scope` - `ScopeFilter::Any` for every scope, or one exact scope.
    ///
    /// # Returns
    ///
    /// A `Result` with the votes or a `VotingError` if the query fails.
    pub async fn find_votes(&self, scope: ScopeFilter) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(VoteFilter::by_voter(&self.voter).scope(scope)).await
    }

    /// Up votes cast by this voter.
    pub async fn find_up_votes(&self, scope: ScopeFilter) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(VoteFilter::by_voter(&self.voter).up().scope(scope)).await
    }

    /// Down votes cast by this voter.
    pub async fn find_down_votes(&self, scope: ScopeFilter) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(VoteFilter::by_voter(&self.voter).down().scope(scope)).await
    }

    /// Votes cast by this voter on records of one kind.
    ///
    /// # Arguments
    ///
    /// * `kind` - The votable type to match.
    /// * `scope` - `ScopeFilter::Any` for every scope, or one exact scope.
    pub async fn find_votes_for_type(&self, kind: &RecordKind, scope: ScopeFilter) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(VoteFilter::by_voter(&self.voter).votable_kind(kind).scope(scope))
            .await
    }

    /// Up votes on records of one kind.
    pub async fn find_up_votes_for_type(
        &self,
        kind: &RecordKind,
        scope: ScopeFilter,
    ) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(VoteFilter::by_voter(&self.voter).votable_kind(kind).up().scope(scope))
            .await
    }

    /// Down votes on records of one kind.
    pub async fn find_down_votes_for_type(
        &self,
        kind: &RecordKind,
        scope: ScopeFilter,
    ) -> Result<Vec<Vote>, VotingError> {
        self.votes_where(VoteFilter::by_voter(&self.voter).votable_kind(kind).down().scope(scope))
            .await
    }

    /// Distinct votables behind the matching votes, in order of first vote.
    async fn voted_refs(&self, filter: VoteFilter) -> Result<Vec<VotableRef>, VotingError> {
        let mut refs: Vec<VotableRef> = Vec::new();
        for vote in self.votes_where(filter).await? {
            if !refs.contains(&vote.votable) {
                refs.push(vote.votable);
            }
        }
        Ok(refs)
    }

    /// Resolves votable references with one resolver call per kind.
    async fn resolve_refs<R: VotableResolver>(
        &self,
        resolver: &R,
        refs: Vec<VotableRef>,
    ) -> Result<Vec<R::Item>, VotingError> {
        let mut batches: Vec<(RecordKind, Vec<i64>)> = Vec::new();
        for votable in refs {
            match batches.iter_mut().find(|(kind, _)| kind == votable.kind()) {
                Some((_, ids)) => ids.push(votable.id()),
                None => batches.push((votable.kind().clone(), vec![votable.id()])),
            }
        }

        let mut items = Vec::new();
        for (kind, ids) in batches {
            items.extend(resolver.resolve(&kind, &ids).await?);
        }
        Ok(items)
    }

    /// Records this voter voted on, each once, in order of first vote.
    ///
    /// # Arguments
    ///
    /// * `resolver` - Loads the records, called once per votable kind.
    /// * `scope` - `ScopeFilter::Any` for every scope, or one exact scope.
    ///
    /// # Returns
    ///
    /// A `Result` with the resolved records or a `VotingError` if the query or
    /// the resolver fails.
    pub async fn find_voted_items<R: VotableResolver>(
        &self,
        resolver: &R,
        scope: ScopeFilter,
    ) -> Result<Vec<R::Item>, VotingError> {
        let refs = self.voted_refs(VoteFilter::by_voter(&self.voter).scope(scope)).await?;
        self.resolve_refs(resolver, refs).await
    }

    /// Records this voter voted up on.
    pub async fn find_up_voted_items<R: VotableResolver>(
        &self,
        resolver: &R,
        scope: ScopeFilter,
    ) -> Result<Vec<R::Item>, VotingError> {
        let refs = self.voted_refs(VoteFilter::by_voter(&self.voter).up().scope(scope)).await?;
        self.resolve_refs(resolver, refs).await
    }

    /// Records this voter voted down on.
    pub async fn find_down_voted_items<R: VotableResolver>(
        &self,
        resolver: &R,
        scope: ScopeFilter,
    ) -> Result<Vec<R::Item>, VotingError> {
        let refs = self.voted_refs(VoteFilter::by_voter(&self.voter).down().scope(scope)).await?;
        self.resolve_refs(resolver, refs).await
    }

    /// Records of one kind this voter voted on.
    pub async fn voted_items_of_type<R: VotableResolver>(
        &self,
        resolver: &R,
        kind: &RecordKind,
        scope: ScopeFilter,
    ) -> Result<Vec<R::Item>, VotingError> {
        let refs = self
            .voted_refs(VoteFilter::by_voter(&self.voter).votable_kind(kind).scope(scope))
            .await?;
        self.resolve_refs(resolver, refs).await
    }

    /// Records of one kind this voter voted up on.
    pub async fn up_voted_items_of_type<R: VotableResolver>(
        &self,
        resolver: &R,
        kind: &RecordKind,
        scope: ScopeFilter,
    ) -> Result<Vec<R::Item>, VotingError> {
        let refs = self
            .voted_refs(VoteFilter::by_voter(&self.voter).votable_kind(kind).up().scope(scope))
            .await?;
        self.resolve_refs(resolver, refs).await
    }

    /// Records of one kind this voter voted down on.
    pub async fn down_voted_items_of_type<R: VotableResolver>(
        &self,
        resolver: &R,
        kind: &RecordKind,
        scope: ScopeFilter,
    ) -> Result<Vec<R::Item>, VotingError> {
        let refs = self
            .voted_refs(VoteFilter::by_voter(&self.voter).votable_kind(kind).down().scope(scope))
            .await?;
        self.resolve_refs(resolver, refs).await
    }

    /// Removes every vote this voter cast, as when the voter is destroyed.
    ///
    /// Cache columns of the affected votables are left as they are.
    pub async fn destroy_votes_by(&self) -> Result<u64, VotingError> {
        let mut tx = self.repository.begin().await?;
        let result = delete_one_by_one(&mut *tx, &VoteFilter::by_voter(&self.voter)).await;
        let removed = finish(tx, result, &self.voter).await?;
        debug!(voter = %self.voter, removed, "Votes destroyed with voter");
        Ok(removed)
    }
}
