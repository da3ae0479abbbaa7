//! Votable Library
//!
//! Lets voter records cast up and down votes, optionally weighted and scoped,
//! on votable records, and keeps the votable records' cached tallies in step
//! with the votes inside the same transaction.

mod aliases;
mod cacheable;
pub mod config;
pub mod errors;
pub mod registry;
pub mod searchable;
pub mod votable;
pub mod voter;
pub mod words;

pub use config::{Dependencies, VotingConfig, init_tracing};
pub use errors::{ConfigurationError, VotingError};
pub use registry::{CacheableStrategy, DependentStrategy, TypeRegistry, VotableOptions, VotableType};
pub use votable::{Votable, VotableAggregate, VoteArgs};
pub use voter::{VotableResolver, Voter, VoterAggregate};
pub use words::{VoteExpression, meaning_of};
