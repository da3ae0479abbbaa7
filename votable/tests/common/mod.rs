//! Shared fixtures for the voting scenarios.
#![allow(dead_code)]

use std::sync::Arc;
use votable::{TypeRegistry, VotableAggregate, VotableOptions, VotableType, VoterAggregate};
use votable_repository::InMemoryVotesRepository;
use votable_shared::types::{CacheColumns, RecordKind, VotableRef, VoterRef};

pub fn user(id: i64) -> VoterRef {
    VoterRef::new(RecordKind::from("User"), id)
}

pub fn post_ref(id: i64) -> VotableRef {
    VotableRef::new(RecordKind::from("Post"), id)
}

/// An in-memory vote store with `Post` registered as votable, `User` as
/// voter, and posts 1 to 3 present.
pub struct Harness {
    pub repository: Arc<InMemoryVotesRepository>,
    pub registry: TypeRegistry,
    pub post_type: Arc<VotableType>,
}

impl Harness {
    pub async fn new(options: VotableOptions) -> Self {
        let repository = Arc::new(InMemoryVotesRepository::new());
        let mut registry = TypeRegistry::new();
        let post_type = registry.register_votable(options).unwrap();
        registry.register_voter("User").unwrap();
        for id in 1..=3 {
            repository.insert_record(&post_ref(id)).await;
        }
        Self {
            repository,
            registry,
            post_type,
        }
    }

    /// Posts without cache columns.
    pub async fn plain() -> Self {
        Self::new(VotableOptions::new("Post", "posts")).await
    }

    /// Posts with the given cache columns, a lock column and a timestamp column.
    pub async fn cached(columns: CacheColumns, strategy: &str) -> Self {
        Self::new(
            VotableOptions::new("Post", "posts")
                .cache_columns(columns)
                .cacheable_strategy(strategy)
                .lock_column("lock_version")
                .timestamp_column("updated_at"),
        )
        .await
    }

    pub fn post(&self, id: i64) -> VotableAggregate {
        VotableAggregate::new(self.repository.clone(), self.post_type.clone(), id)
    }

    pub fn voter(&self, id: i64) -> VoterAggregate {
        VoterAggregate::new(self.repository.clone(), user(id))
    }
}
