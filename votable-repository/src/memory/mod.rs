//! In-memory implementation of the votes repository.
//!
//! Keeps votes and votable cache columns behind a single async mutex.
//! Transactions hold the mutex for their whole lifetime and work on a copy
//! of the state, so they are fully serialized and a dropped transaction
//! leaves nothing behind.
mod votes_repository;

pub use votes_repository::{InMemoryVoteReader, InMemoryVotesRepository, InMemoryVotesTransaction, RecordState};
