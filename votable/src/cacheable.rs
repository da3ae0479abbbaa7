//! Cache aggregation engine.
//!
//! Computes vote tallies straight from the `votes` table and turns them into
//! a [`CacheWrite`] for the cache columns a votable type actually has. Only
//! the queries a requested field needs are run, and each one at most once.
use crate::registry::{CacheableStrategy, VotableType};
use votable_repository::{RepositoryError, VoteQueries, VotesTransaction};
use votable_shared::types::{CacheField, CacheKey, CacheValue, CacheWrite, OptimisticLock, ScopeFilter, VotableRef, VoteFilter};

/// Lazily computed aggregates over one vote selection.
pub(crate) struct Tally<'a, Q: VoteQueries + ?Sized> {
    queries: &'a mut Q,
    filter: VoteFilter,
    total: Option<i64>,
    up: Option<i64>,
    down: Option<i64>,
    up_weight: Option<i64>,
    down_weight: Option<i64>,
}

impl<'a, Q: VoteQueries + ?Sized> Tally<'a, Q> {
    pub(crate) fn new(queries: &'a mut Q, filter: VoteFilter) -> Self {
        Self {
            queries,
            filter,
            total: None,
            up: None,
            down: None,
            up_weight: None,
            down_weight: None,
        }
    }

    /// Votes on `target`, all scopes when `scope` is `None`.
    pub(crate) fn for_target(queries: &'a mut Q, target: &VotableRef, scope: Option<&str>) -> Self {
        Self::new(
            queries,
            VoteFilter::for_votable(target).scope(ScopeFilter::when_present(scope)),
        )
    }

    async fn total(&mut self) -> Result<i64, RepositoryError> {
        if let Some(total) = self.total {
            return Ok(total);
        }
        let total = self.queries.count_votes(&self.filter).await?;
        self.total = Some(total);
        Ok(total)
    }

    async fn up(&mut self) -> Result<i64, RepositoryError> {
        if let Some(up) = self.up {
            return Ok(up);
        }
        let up = self.queries.count_votes(&self.filter.clone().up()).await?;
        self.up = Some(up);
        Ok(up)
    }

    async fn down(&mut self) -> Result<i64, RepositoryError> {
        if let Some(down) = self.down {
            return Ok(down);
        }
        let down = self.queries.count_votes(&self.filter.clone().down()).await?;
        self.down = Some(down);
        Ok(down)
    }

    async fn up_weight(&mut self) -> Result<i64, RepositoryError> {
        if let Some(weight) = self.up_weight {
            return Ok(weight);
        }
        let weight = self.queries.sum_weights(&self.filter.clone().up()).await?;
        self.up_weight = Some(weight);
        Ok(weight)
    }

    async fn down_weight(&mut self) -> Result<i64, RepositoryError> {
        if let Some(weight) = self.down_weight {
            return Ok(weight);
        }
        let weight = self.queries.sum_weights(&self.filter.clone().down()).await?;
        self.down_weight = Some(weight);
        Ok(weight)
    }

    async fn weighted_score(&mut self) -> Result<i64, RepositoryError> {
        Ok(self.up_weight().await? - self.down_weight().await?)
    }

    pub(crate) async fn value(&mut self, field: CacheField) -> Result<CacheValue, RepositoryError> {
        let value = match field {
            CacheField::VotesTotal => CacheValue::Count(self.total().await?),
            CacheField::VotesUp => CacheValue::Count(self.up().await?),
            CacheField::VotesDown => CacheValue::Count(self.down().await?),
            CacheField::VotesScore => CacheValue::Count(self.up().await? - self.down().await?),
            // Magnitude of all activity: down weights count positively here.
            CacheField::WeightedTotal => CacheValue::Count(self.up_weight().await? + self.down_weight().await?),
            CacheField::WeightedScore => CacheValue::Count(self.weighted_score().await?),
            CacheField::WeightedAverage => {
                let total = self.total().await?;
                if total == 0 {
                    CacheValue::Average(0.0)
                } else {
                    CacheValue::Average(self.weighted_score().await? as f64 / total as f64)
                }
            }
        };
        Ok(value)
    }
}

/// Computes fresh values for every cache column of `votable_type` touched by
/// a vote in `scope`: the global columns, plus that scope's columns if any.
///
/// Returns `None` when the type has none of those columns.
pub(crate) async fn compute_cache_write<Q: VoteQueries + ?Sized>(
    queries: &mut Q,
    votable_type: &VotableType,
    target: &VotableRef,
    scope: Option<&str>,
    lock_version: i64,
) -> Result<Option<CacheWrite>, RepositoryError> {
    let mut updates = Vec::new();

    let global_fields = votable_type.cache_columns.fields_for(None);
    if !global_fields.is_empty() {
        let mut tally = Tally::for_target(&mut *queries, target, None);
        for field in global_fields {
            updates.push((CacheKey::global(field), tally.value(field).await?));
        }
    }

    if let Some(scope) = scope {
        let scoped_fields = votable_type.cache_columns.fields_for(Some(scope));
        if !scoped_fields.is_empty() {
            let mut tally = Tally::for_target(&mut *queries, target, Some(scope));
            for field in scoped_fields {
                updates.push((CacheKey::scoped(field, scope), tally.value(field).await?));
            }
        }
    }

    if updates.is_empty() {
        return Ok(None);
    }

    let (touch_column, lock) = match votable_type.cacheable_strategy {
        CacheableStrategy::Update => (
            votable_type.timestamp_column.clone(),
            votable_type.lock_column.clone().map(|column| OptimisticLock {
                column,
                expected: lock_version,
            }),
        ),
        CacheableStrategy::UpdateColumns => (None, None),
    };

    Ok(Some(CacheWrite {
        table: votable_type.table.clone(),
        target: target.clone(),
        updates,
        touch_column,
        lock,
    }))
}

/// Recomputes and writes the cache columns inside an open transaction.
///
/// Returns the batch that was written so the caller can refresh its
/// in-memory snapshot once the transaction commits.
pub(crate) async fn update_cached_votes(
    tx: &mut dyn VotesTransaction,
    votable_type: &VotableType,
    target: &VotableRef,
    scope: Option<&str>,
    lock_version: i64,
) -> Result<Option<CacheWrite>, RepositoryError> {
    let write = compute_cache_write(&mut *tx, votable_type, target, scope, lock_version).await?;
    if let Some(write) = &write {
        tx.write_cache(write).await?;
    }
    Ok(write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VotableOptions;
    use votable_repository::{InMemoryVotesRepository, VotesRepository};
    use votable_shared::types::{CacheColumns, NewVote, RecordKind, VoterRef};

    fn post() -> VotableRef {
        VotableRef::new(RecordKind::from("Post"), 1)
    }

    fn vote(voter: i64, flag: bool, weight: i32, scope: Option<&str>) -> NewVote {
        NewVote {
            votable: post(),
            voter: VoterRef::new(RecordKind::from("User"), voter),
            vote_flag: flag,
            vote_scope: scope.map(str::to_owned),
            vote_weight: weight,
            uniqueness_token: String::new(),
        }
    }

    async fn seeded_repository() -> InMemoryVotesRepository {
        let repository = InMemoryVotesRepository::new();
        let mut tx = repository.begin().await.unwrap();
        tx.insert_vote(&vote(1, true, 3, None)).await.unwrap();
        tx.insert_vote(&vote(2, false, 1, None)).await.unwrap();
        tx.insert_vote(&vote(3, true, 2, Some("weekly"))).await.unwrap();
        tx.commit().await.unwrap();
        repository
    }

    fn votable_type(cache_columns: CacheColumns, strategy: &str) -> VotableType {
        VotableType::try_from(
            VotableOptions::new("Post", "posts")
                .cache_columns(cache_columns)
                .cacheable_strategy(strategy)
                .lock_column("lock_version")
                .timestamp_column("updated_at"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tally_formulas() {
        let repository = seeded_repository().await;
        let mut reader = repository.reader().await.unwrap();
        let mut tally = Tally::for_target(&mut *reader, &post(), None);

        assert_eq!(tally.value(CacheField::VotesTotal).await.unwrap(), CacheValue::Count(3));
        assert_eq!(tally.value(CacheField::VotesUp).await.unwrap(), CacheValue::Count(2));
        assert_eq!(tally.value(CacheField::VotesDown).await.unwrap(), CacheValue::Count(1));
        assert_eq!(tally.value(CacheField::VotesScore).await.unwrap(), CacheValue::Count(1));
        assert_eq!(tally.value(CacheField::WeightedTotal).await.unwrap(), CacheValue::Count(6));
        assert_eq!(tally.value(CacheField::WeightedScore).await.unwrap(), CacheValue::Count(4));
        assert_eq!(
            tally.value(CacheField::WeightedAverage).await.unwrap(),
            CacheValue::Average(4.0 / 3.0)
        );
    }

    #[tokio::test]
    async fn test_weighted_average_without_votes_is_zero() {
        let repository = InMemoryVotesRepository::new();
        let mut reader = repository.reader().await.unwrap();
        let mut tally = Tally::for_target(&mut *reader, &post(), Some("weekly"));

        assert_eq!(
            tally.value(CacheField::WeightedAverage).await.unwrap(),
            CacheValue::Average(0.0)
        );
    }

    #[tokio::test]
    async fn test_write_covers_global_and_requested_scope_only() {
        let repository = seeded_repository().await;
        let columns = CacheColumns::new()
            .with_global(CacheField::VotesTotal)
            .with_scoped("weekly", CacheField::VotesTotal)
            .with_scoped("monthly", CacheField::VotesTotal);
        let post_type = votable_type(columns, "update");
        let mut reader = repository.reader().await.unwrap();

        let write = compute_cache_write(&mut *reader, &post_type, &post(), Some("weekly"), 4)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            write.updates,
            vec![
                (CacheKey::global(CacheField::VotesTotal), CacheValue::Count(3)),
                (CacheKey::scoped(CacheField::VotesTotal, "weekly"), CacheValue::Count(1)),
            ]
        );
        assert_eq!(write.touch_column.as_deref(), Some("updated_at"));
        assert_eq!(
            write.lock,
            Some(OptimisticLock {
                column: "lock_version".to_string(),
                expected: 4
            })
        );
    }

    #[tokio::test]
    async fn test_update_columns_strategy_skips_touch_and_lock() {
        let repository = seeded_repository().await;
        let post_type = votable_type(CacheColumns::all_global(), "update_columns");
        let mut reader = repository.reader().await.unwrap();

        let write = compute_cache_write(&mut *reader, &post_type, &post(), None, 0)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(write.updates.len(), 7);
        assert_eq!(write.touch_column, None);
        assert_eq!(write.lock, None);
    }

    #[tokio::test]
    async fn test_no_cache_columns_means_no_write() {
        let repository = seeded_repository().await;
        let post_type = votable_type(CacheColumns::new().with_all_scoped("monthly"), "update");
        let mut reader = repository.reader().await.unwrap();

        let write = compute_cache_write(&mut *reader, &post_type, &post(), Some("weekly"), 0)
            .await
            .unwrap();

        assert!(write.is_none());
    }
}
