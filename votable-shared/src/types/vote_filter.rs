use crate::types::{RecordKind, VotableRef, Vote, VoterRef};

/// How a query treats the `vote_scope` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Votes in every scope, including the default one.
    #[default]
    Any,
    /// Votes in exactly this scope; `None` selects unscoped votes only.
    Exactly(Option<String>),
}

impl ScopeFilter {
    pub fn unscoped() -> Self {
        Self::Exactly(None)
    }

    pub fn named(scope: impl Into<String>) -> Self {
        Self::Exactly(Some(scope.into()))
    }

    /// Exact match on an optional scope, `None` meaning the default scope.
    pub fn exactly(scope: Option<&str>) -> Self {
        Self::Exactly(scope.map(str::to_owned))
    }

    /// Narrows to a scope only when one is given, otherwise matches all scopes.
    pub fn when_present(scope: Option<&str>) -> Self {
        match scope {
            Some(scope) => Self::named(scope),
            None => Self::Any,
        }
    }

    pub fn matches(&self, scope: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(expected) => expected.as_deref() == scope,
        }
    }
}

/// Equality criteria over the `votes` table.
///
/// Every `Some` field narrows the selection; an empty filter matches all votes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteFilter {
    pub votable: Option<VotableRef>,
    pub votable_kind: Option<RecordKind>,
    pub voter: Option<VoterRef>,
    pub voter_kind: Option<RecordKind>,
    pub flag: Option<bool>,
    pub scope: ScopeFilter,
}

impl VoteFilter {
    /// Votes received by one votable record.
    pub fn for_votable(votable: &VotableRef) -> Self {
        Self {
            votable: Some(votable.clone()),
            ..Self::default()
        }
    }

    /// Votes cast by one voter.
    pub fn by_voter(voter: &VoterRef) -> Self {
        Self {
            voter: Some(voter.clone()),
            ..Self::default()
        }
    }

    pub fn votable(mut self, votable: &VotableRef) -> Self {
        self.votable = Some(votable.clone());
        self
    }

    pub fn voter(mut self, voter: &VoterRef) -> Self {
        self.voter = Some(voter.clone());
        self
    }

    pub fn votable_kind(mut self, kind: &RecordKind) -> Self {
        self.votable_kind = Some(kind.clone());
        self
    }

    pub fn voter_kind(mut self, kind: &RecordKind) -> Self {
        self.voter_kind = Some(kind.clone());
        self
    }

    pub fn flag(mut self, flag: Option<bool>) -> Self {
        self.flag = flag;
        self
    }

    pub fn up(self) -> Self {
        self.flag(Some(true))
    }

    pub fn down(self) -> Self {
        self.flag(Some(false))
    }

    pub fn scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Evaluates the filter against a vote already in memory.
    pub fn matches(&self, vote: &Vote) -> bool {
        self.votable.as_ref().is_none_or(|v| *v == vote.votable)
            && self.votable_kind.as_ref().is_none_or(|k| k == vote.votable.kind())
            && self.voter.as_ref().is_none_or(|v| *v == vote.voter)
            && self.voter_kind.as_ref().is_none_or(|k| k == vote.voter.kind())
            && self.flag.is_none_or(|f| f == vote.vote_flag)
            && self.scope.matches(vote.vote_scope.as_deref())
    }
}
