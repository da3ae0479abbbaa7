//! # Votable Shared
//! This crate defines the data structures shared by the voting repository
//! and the voting core: polymorphic record references, vote records, query
//! criteria, cache column descriptors and ranking results.
pub mod types;
