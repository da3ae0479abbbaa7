//! # Votable Repository
//! This crate provides the storage contract used by the voting core and its
//! implementations. It includes definitions for errors, interfaces, a
//! PostgreSQL backend and an in-memory backend.
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::RepositoryError;
pub use interfaces::{VoteQueries, VotesRepository, VotesTransaction};
pub use memory::{InMemoryVotesRepository, RecordState};
pub use postgres::{MIGRATOR, PostgresVotesRepository, is_identifier};
