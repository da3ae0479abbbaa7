mod cache;
mod ranking;
mod record_ref;
mod vote;
mod vote_filter;

pub use cache::{CacheColumns, CacheField, CacheKey, CacheSnapshot, CacheValue, CacheWrite, OptimisticLock};
pub use ranking::{RankOrder, RankedVotable};
pub use record_ref::{RecordKind, RecordRef, VotableRef, VoterRef};
pub use vote::{NewVote, Vote};
pub use vote_filter::{ScopeFilter, VoteFilter};
