//! Familiar names for the voting operations. Each one only delegates.
use crate::errors::VotingError;
use crate::votable::VotableAggregate;
use crate::voter::{VotableResolver, VoterAggregate};
use votable_shared::types::{ScopeFilter, VotableRef, Vote, VoterRef};

impl VotableAggregate {
    pub async fn liked_by(&mut self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.cast_up(Some(voter), None, None).await
    }

    pub async fn upvote_by(&mut self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.cast_up(Some(voter), None, None).await
    }

    pub async fn disliked_by(&mut self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.cast_down(Some(voter), None, None).await
    }

    pub async fn downvote_by(&mut self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.cast_down(Some(voter), None, None).await
    }

    pub async fn unliked_by(&mut self, voter: &VoterRef) -> Result<bool, VotingError> {
        self.uncast(Some(voter), None).await
    }

    pub async fn get_likes(&self) -> Result<Vec<Vote>, VotingError> {
        self.get_up_votes(None).await
    }

    pub async fn get_dislikes(&self) -> Result<Vec<Vote>, VotingError> {
        self.get_down_votes(None).await
    }
}

impl VoterAggregate {
    pub async fn likes(&self, votable: &mut VotableAggregate) -> Result<bool, VotingError> {
        self.vote_up_for(votable, None, None).await
    }

    pub async fn dislikes(&self, votable: &mut VotableAggregate) -> Result<bool, VotingError> {
        self.vote_down_for(votable, None, None).await
    }

    pub async fn unlike(&self, votable: &mut VotableAggregate) -> Result<bool, VotingError> {
        self.unvote_for(votable, None).await
    }

    pub async fn liked(&self, votable: &VotableRef) -> Result<bool, VotingError> {
        self.voted_up_on(votable, None).await
    }

    pub async fn disliked(&self, votable: &VotableRef) -> Result<bool, VotingError> {
        self.voted_down_on(votable, None).await
    }

    pub async fn voted_for(&self, votable: &VotableRef) -> Result<bool, VotingError> {
        self.voted_on(votable, None).await
    }

    pub async fn find_liked_items<R: VotableResolver>(&self, resolver: &R) -> Result<Vec<R::Item>, VotingError> {
        self.find_up_voted_items(resolver, ScopeFilter::unscoped()).await
    }

    pub async fn find_disliked_items<R: VotableResolver>(&self, resolver: &R) -> Result<Vec<R::Item>, VotingError> {
        self.find_down_voted_items(resolver, ScopeFilter::unscoped()).await
    }
}
