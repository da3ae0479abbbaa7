//! Error types for the votable repository.
//! Consolidates and re-exports error types related to vote storage operations.
mod repository;

pub use repository::RepositoryError;
