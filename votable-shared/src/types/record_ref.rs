use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a record type that takes part in voting.
///
/// This is the tag stored in the `votable_type` and `voter_type` columns of
/// the `votes` table. Kinds are handed out by the type registry when a type
/// opts in, so references are never built from free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKind(String);

impl RecordKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKind {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RecordKind {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A polymorphic reference: the kind of a record plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub kind: RecordKind,
    pub id: i64,
}

impl RecordRef {
    pub fn new(kind: RecordKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Reference to a record on the receiving side of a vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VotableRef(RecordRef);

impl VotableRef {
    pub fn new(kind: RecordKind, id: i64) -> Self {
        Self(RecordRef::new(kind, id))
    }

    pub fn kind(&self) -> &RecordKind {
        &self.0.kind
    }

    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn as_record(&self) -> &RecordRef {
        &self.0
    }
}

impl fmt::Display for VotableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to a record that casts votes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterRef(RecordRef);

impl VoterRef {
    pub fn new(kind: RecordKind, id: i64) -> Self {
        Self(RecordRef::new(kind, id))
    }

    pub fn kind(&self) -> &RecordKind {
        &self.0.kind
    }

    pub fn id(&self) -> i64 {
        self.0.id
    }

    pub fn as_record(&self) -> &RecordRef {
        &self.0
    }
}

impl fmt::Display for VoterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_votable_and_voter_refs_display_kind_and_id() {
        let votable = VotableRef::new(RecordKind::from("Post"), 7);
        let voter = VoterRef::new(RecordKind::from("User"), 3);

        assert_eq!(votable.to_string(), "Post#7");
        assert_eq!(voter.to_string(), "User#3");
        assert_eq!(votable.kind().as_str(), "Post");
        assert_eq!(voter.id(), 3);
    }

    #[test]
    fn test_record_kind_serializes_as_plain_string() {
        let votable = VotableRef::new(RecordKind::from("Post"), 7);
        let json = serde_json::to_string(&votable).unwrap();

        assert_eq!(json, r#"{"kind":"Post","id":7}"#);
    }
}
