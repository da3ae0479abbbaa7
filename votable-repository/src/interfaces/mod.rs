//! This module defines and re-exports the interfaces for the votes repository.
//! It serves as a central point for accessing traits related to vote storage.
mod votes;

pub use votes::{VoteQueries, VotesRepository, VotesTransaction};
