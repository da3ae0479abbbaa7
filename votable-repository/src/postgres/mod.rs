//! PostgreSQL implementation of the votes repository.
//!
//! ## Database Tables
//!
//! - `votes`: one row per cast vote, polymorphic on both sides
//! - votable tables owned by the host application, whose optional
//!   `cached_*` columns are written by [`VotesTransaction::write_cache`]
//!
//! [`VotesTransaction::write_cache`]: crate::VotesTransaction::write_cache
mod queries;
mod votes_repository;

pub use queries::is_identifier;
pub use votes_repository::{PostgresVoteReader, PostgresVotesRepository, PostgresVotesTransaction};

/// Embedded migrations creating the `votes` table and its indexes.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("src/postgres/migrations");
