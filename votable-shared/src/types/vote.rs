use crate::types::{VotableRef, VoterRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted vote cast by a voter on a votable record.
///
/// At most one vote exists per voter, votable and scope. Votes cast with the
/// duplicate escape hatch carry a non-empty `uniqueness_token` so the unique
/// index on the `votes` table accepts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub votable: VotableRef,
    pub voter: VoterRef,
    /// `true` for an up vote, `false` for a down vote.
    pub vote_flag: bool,
    /// `None` is the default, global scope.
    pub vote_scope: Option<String>,
    pub vote_weight: i32,
    pub uniqueness_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    pub fn is_up(&self) -> bool {
        self.vote_flag
    }

    pub fn is_down(&self) -> bool {
        !self.vote_flag
    }
}

/// A vote that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub votable: VotableRef,
    pub voter: VoterRef,
    pub vote_flag: bool,
    pub vote_scope: Option<String>,
    pub vote_weight: i32,
    pub uniqueness_token: String,
}
