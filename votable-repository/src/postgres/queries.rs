//! SQL shared by pooled connections and open transactions.
//!
//! Every function takes a bare `PgConnection` so the same statement runs
//! against either one.
use crate::errors::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use votable_shared::types::{
    CacheValue, CacheWrite, NewVote, RankOrder, RankedVotable, RecordKind, ScopeFilter, VotableRef, Vote, VoteFilter,
    VoterRef,
};

const VOTE_COLUMNS: &str = "id, votable_type, votable_id, voter_type, voter_id, vote_flag, vote_scope, vote_weight, uniqueness_token, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    id: i64,
    votable_type: String,
    votable_id: i64,
    voter_type: String,
    voter_id: i64,
    vote_flag: bool,
    vote_scope: Option<String>,
    vote_weight: i32,
    uniqueness_token: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Vote {
            id: row.id,
            votable: VotableRef::new(RecordKind::from(row.votable_type), row.votable_id),
            voter: VoterRef::new(RecordKind::from(row.voter_type), row.voter_id),
            vote_flag: row.vote_flag,
            vote_scope: row.vote_scope,
            vote_weight: row.vote_weight,
            uniqueness_token: row.uniqueness_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Appends a `WHERE` clause for `filter`, binding every value.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &VoteFilter) {
    builder.push(" WHERE TRUE");
    if let Some(votable) = &filter.votable {
        builder.push(" AND votable_type = ").push_bind(votable.kind().as_str().to_owned());
        builder.push(" AND votable_id = ").push_bind(votable.id());
    }
    if let Some(kind) = &filter.votable_kind {
        builder.push(" AND votable_type = ").push_bind(kind.as_str().to_owned());
    }
    if let Some(voter) = &filter.voter {
        builder.push(" AND voter_type = ").push_bind(voter.kind().as_str().to_owned());
        builder.push(" AND voter_id = ").push_bind(voter.id());
    }
    if let Some(kind) = &filter.voter_kind {
        builder.push(" AND voter_type = ").push_bind(kind.as_str().to_owned());
    }
    if let Some(flag) = filter.flag {
        builder.push(" AND vote_flag = ").push_bind(flag);
    }
    match &filter.scope {
        ScopeFilter::Any => {}
        ScopeFilter::Exactly(None) => {
            builder.push(" AND vote_scope IS NULL");
        }
        ScopeFilter::Exactly(Some(scope)) => {
            builder.push(" AND vote_scope = ").push_bind(scope.clone());
        }
    }
}

/// Accepts `name` or `schema.name` made of ASCII letters, digits and underscores.
pub fn is_identifier(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty()
                && !part.starts_with(|c: char| c.is_ascii_digit())
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn ensure_identifier(value: &str) -> Result<(), RepositoryError> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidIdentifier(value.to_owned()))
    }
}

pub(crate) async fn find_votes(conn: &mut PgConnection, filter: &VoteFilter) -> Result<Vec<Vote>, RepositoryError> {
    let mut builder = QueryBuilder::new(format!("SELECT {VOTE_COLUMNS} FROM votes"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY id ASC");
    let rows = builder.build_query_as::<VoteRow>().fetch_all(conn).await?;
    Ok(rows.into_iter().map(Vote::from).collect())
}

pub(crate) async fn last_vote(conn: &mut PgConnection, filter: &VoteFilter) -> Result<Option<Vote>, RepositoryError> {
    let mut builder = QueryBuilder::new(format!("SELECT {VOTE_COLUMNS} FROM votes"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY id DESC LIMIT 1");
    let row = builder.build_query_as::<VoteRow>().fetch_optional(conn).await?;
    Ok(row.map(Vote::from))
}

pub(crate) async fn count_votes(conn: &mut PgConnection, filter: &VoteFilter) -> Result<i64, RepositoryError> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM votes");
    push_filter(&mut builder, filter);
    let count = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}

pub(crate) async fn sum_weights(conn: &mut PgConnection, filter: &VoteFilter) -> Result<i64, RepositoryError> {
    let mut builder = QueryBuilder::new("SELECT COALESCE(SUM(vote_weight), 0)::BIGINT FROM votes");
    push_filter(&mut builder, filter);
    let sum = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(sum)
}

pub(crate) async fn vote_exists(conn: &mut PgConnection, filter: &VoteFilter) -> Result<bool, RepositoryError> {
    let mut builder = QueryBuilder::new("SELECT EXISTS(SELECT 1 FROM votes");
    push_filter(&mut builder, filter);
    builder.push(")");
    let exists = builder.build_query_scalar::<bool>().fetch_one(conn).await?;
    Ok(exists)
}

pub(crate) async fn insert_vote(conn: &mut PgConnection, vote: &NewVote) -> Result<Vote, RepositoryError> {
    let sql = format!(
        "INSERT INTO votes (votable_type, votable_id, voter_type, voter_id, vote_flag, vote_scope, vote_weight, uniqueness_token) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {VOTE_COLUMNS}"
    );
    let result = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(vote.votable.kind().as_str())
        .bind(vote.votable.id())
        .bind(vote.voter.kind().as_str())
        .bind(vote.voter.id())
        .bind(vote.vote_flag)
        .bind(vote.vote_scope.as_deref())
        .bind(vote.vote_weight)
        .bind(vote.uniqueness_token.as_str())
        .fetch_one(conn)
        .await;

    match result {
        Ok(row) => Ok(row.into()),
        Err(err) => {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_unique_violation() {
                    return Err(RepositoryError::DuplicateVote(format!(
                        "{} already voted on {} in scope {:?}",
                        vote.voter, vote.votable, vote.vote_scope
                    )));
                }
            }
            Err(err.into())
        }
    }
}

pub(crate) async fn update_vote(
    conn: &mut PgConnection,
    id: i64,
    vote_flag: bool,
    vote_weight: i32,
) -> Result<Vote, RepositoryError> {
    let sql = format!(
        "UPDATE votes SET vote_flag = $1, vote_weight = $2, updated_at = clock_timestamp() WHERE id = $3 RETURNING {VOTE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(vote_flag)
        .bind(vote_weight)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(Vote::from)
        .ok_or_else(|| RepositoryError::RecordNotFound(format!("vote {id}")))
}

pub(crate) async fn delete_votes(conn: &mut PgConnection, ids: &[i64]) -> Result<u64, RepositoryError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM votes WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_matching(conn: &mut PgConnection, filter: &VoteFilter) -> Result<u64, RepositoryError> {
    let mut builder = QueryBuilder::new("DELETE FROM votes");
    push_filter(&mut builder, filter);
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

/// Writes a cache batch with a single `UPDATE` on the votable table.
pub(crate) async fn write_cache(conn: &mut PgConnection, write: &CacheWrite) -> Result<(), RepositoryError> {
    if write.updates.is_empty() {
        return Ok(());
    }
    ensure_identifier(&write.table)?;

    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", write.table));
    {
        let mut assignments = builder.separated(", ");
        for (key, value) in &write.updates {
            let column = key.column();
            ensure_identifier(&column)?;
            assignments.push(format!("{column} = "));
            match value {
                CacheValue::Count(count) => assignments.push_bind_unseparated(*count),
                CacheValue::Average(average) => assignments.push_bind_unseparated(*average),
            };
        }
        if let Some(column) = &write.touch_column {
            ensure_identifier(column)?;
            assignments.push(format!("{column} = now()"));
        }
        if let Some(lock) = &write.lock {
            ensure_identifier(&lock.column)?;
            assignments.push(format!("{0} = {0} + 1", lock.column));
        }
    }
    builder.push(" WHERE id = ").push_bind(write.target.id());
    if let Some(lock) = &write.lock {
        builder.push(format!(" AND {} = ", lock.column)).push_bind(lock.expected);
    }

    let result = builder.build().execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(match &write.lock {
            Some(lock) => RepositoryError::StaleRecord(format!(
                "{} in {} (expected {} = {})",
                write.target, write.table, lock.column, lock.expected
            )),
            None => RepositoryError::RecordNotFound(format!("{} in {}", write.target, write.table)),
        });
    }
    Ok(())
}

pub(crate) async fn table_columns(conn: &mut PgConnection, table: &str) -> Result<Vec<String>, RepositoryError> {
    let (schema, name) = match table.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, table),
    };
    let columns = sqlx::query_scalar::<_, String>(
        r#"
        SELECT column_name::TEXT
        FROM information_schema.columns
        WHERE table_name = $1 AND table_schema = COALESCE($2::TEXT, current_schema()::TEXT)
        ORDER BY ordinal_position
        "#,
    )
    .bind(name)
    .bind(schema)
    .fetch_all(conn)
    .await?;
    Ok(columns)
}

pub(crate) async fn rank_votables(
    conn: &mut PgConnection,
    kind: &RecordKind,
    order: RankOrder,
    limit: i64,
) -> Result<Vec<RankedVotable>, RepositoryError> {
    let direction = match order {
        RankOrder::Best => "DESC",
        RankOrder::Worst => "ASC",
    };
    let sql = format!(
        "SELECT votable_id, COUNT(*) AS votes, SUM(CASE WHEN vote_flag THEN 1 ELSE -1 END)::BIGINT AS score \
         FROM votes WHERE votable_type = $1 \
         GROUP BY votable_id ORDER BY score {direction}, votable_id ASC LIMIT $2"
    );
    let rows = sqlx::query_as::<_, (i64, i64, i64)>(&sql)
        .bind(kind.as_str())
        .bind(limit.max(0))
        .fetch_all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, votes, score)| RankedVotable {
            votable: VotableRef::new(kind.clone(), id),
            score,
            votes,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier_accepts_plain_and_schema_qualified_names() {
        assert!(is_identifier("posts"));
        assert!(is_identifier("public.posts"));
        assert!(is_identifier("cached_scoped_weekly_votes_up"));
    }

    #[test]
    fn test_is_identifier_rejects_injection_attempts() {
        assert!(!is_identifier(""));
        assert!(!is_identifier("posts; DROP TABLE votes"));
        assert!(!is_identifier("1posts"));
        assert!(!is_identifier("a.b.c"));
        assert!(!is_identifier("posts\""));
    }

    #[test]
    fn test_push_filter_binds_every_criterion() {
        let votable = VotableRef::new(RecordKind::from("Post"), 1);
        let filter = VoteFilter::for_votable(&votable)
            .up()
            .scope(ScopeFilter::named("weekly"));
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM votes");
        push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM votes WHERE TRUE AND votable_type = $1 AND votable_id = $2 AND vote_flag = $3 AND vote_scope = $4"
        );
    }

    #[test]
    fn test_push_filter_unscoped_uses_is_null() {
        let filter = VoteFilter::default().scope(ScopeFilter::unscoped());
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM votes");
        push_filter(&mut builder, &filter);

        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM votes WHERE TRUE AND vote_scope IS NULL");
    }
}
