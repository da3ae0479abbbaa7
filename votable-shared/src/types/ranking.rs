use crate::types::VotableRef;
use serde::{Deserialize, Serialize};

/// Direction of a ranking by net score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankOrder {
    /// Highest net score first.
    Best,
    /// Lowest net score first.
    Worst,
}

/// A votable record with the tallies it was ranked by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedVotable {
    pub votable: VotableRef,
    /// Up votes minus down votes, unweighted.
    pub score: i64,
    pub votes: i64,
}
