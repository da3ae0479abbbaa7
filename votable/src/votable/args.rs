use crate::words::VoteExpression;

/// Arguments of a single cast.
///
/// Defaults to an unweighted up vote in the default scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteArgs {
    pub vote: VoteExpression,
    pub scope: Option<String>,
    pub weight: Option<i64>,
    /// Add a new vote row even when the voter already voted in this scope.
    pub duplicate: bool,
}

impl VoteArgs {
    pub fn new(vote: impl Into<VoteExpression>) -> Self {
        Self {
            vote: vote.into(),
            ..Self::default()
        }
    }

    pub fn up() -> Self {
        Self::new(true)
    }

    pub fn down() -> Self {
        Self::new(false)
    }

    pub fn scope(self, scope: &str) -> Self {
        self.scope_opt(Some(scope))
    }

    pub fn scope_opt(mut self, scope: Option<&str>) -> Self {
        self.scope = scope.map(str::to_owned);
        self
    }

    pub fn weight(self, weight: i64) -> Self {
        self.weight_opt(Some(weight))
    }

    pub fn weight_opt(mut self, weight: Option<i64>) -> Self {
        self.weight = weight;
        self
    }

    pub fn duplicate(mut self, duplicate: bool) -> Self {
        self.duplicate = duplicate;
        self
    }
}
