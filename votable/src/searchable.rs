//! Rankings of votable records by net score.
use crate::errors::VotingError;
use crate::registry::VotableType;
use votable_repository::VotesRepository;
use votable_shared::types::{RankOrder, RankedVotable};

/// Highest scoring records of a votable type, up votes minus down votes.
///
/// Records without votes are not ranked. Ties go to the lower id. A negative
/// `limit` ranks nothing.
pub async fn best(
    repository: &dyn VotesRepository,
    votable_type: &VotableType,
    limit: i64,
) -> Result<Vec<RankedVotable>, VotingError> {
    Ok(repository
        .rank_votables(&votable_type.kind, RankOrder::Best, limit.max(0))
        .await?)
}

/// Lowest scoring records of a votable type.
pub async fn worst(
    repository: &dyn VotesRepository,
    votable_type: &VotableType,
    limit: i64,
) -> Result<Vec<RankedVotable>, VotingError> {
    Ok(repository
        .rank_votables(&votable_type.kind, RankOrder::Worst, limit.max(0))
        .await?)
}
