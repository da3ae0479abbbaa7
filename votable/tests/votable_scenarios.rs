//! Casting, removing and counting votes on a votable record.
//!
//! Run with: `cargo test --test votable_scenarios`

mod common;

use common::{Harness, post_ref, user};
use votable::{VoteArgs, VotableOptions, searchable};
use votable_shared::types::CacheColumns;

#[tokio::test]
async fn test_vote_change_and_removal_walkthrough() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    assert!(post.cast(Some(&voter), VoteArgs::up().weight(1)).await.unwrap());
    assert_eq!(post.count_votes_up(false, None).await.unwrap(), 1);
    assert_eq!(post.count_votes_total(false, None).await.unwrap(), 1);

    assert!(post.cast(Some(&voter), VoteArgs::new("dislike")).await.unwrap());
    assert_eq!(post.count_votes_up(false, None).await.unwrap(), 0);
    assert_eq!(post.count_votes_down(false, None).await.unwrap(), 1);
    assert!(post.vote_registered());

    assert!(post.uncast(Some(&voter), None).await.unwrap());
    assert_eq!(post.count_votes_total(false, None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cast_without_voter_is_rejected() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    assert!(!post.cast(None, VoteArgs::up()).await.unwrap());
    assert!(!post.uncast(None, None).await.unwrap());
    assert!(harness.repository.all_votes().await.is_empty());
}

#[tokio::test]
async fn test_same_vote_twice_is_not_registered() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast_up(Some(&voter), None, None).await.unwrap();
    assert!(post.vote_registered());

    post.cast_up(Some(&voter), None, None).await.unwrap();
    assert!(!post.vote_registered());
    assert_eq!(harness.repository.all_votes().await.len(), 1);
}

#[tokio::test]
async fn test_flag_change_updates_the_vote_in_place() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast(Some(&voter), VoteArgs::new(true)).await.unwrap();
    post.cast(Some(&voter), VoteArgs::new(false)).await.unwrap();

    let votes = harness.repository.all_votes().await;
    assert_eq!(votes.len(), 1);
    assert!(!votes[0].vote_flag);
    assert!(post.vote_registered());
}

#[tokio::test]
async fn test_weight_change_is_registered() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast_up(Some(&voter), None, Some(1)).await.unwrap();
    post.cast_up(Some(&voter), None, Some(2)).await.unwrap();

    assert!(post.vote_registered());
    assert_eq!(post.weighted_score(true, None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_non_positive_weight_defaults_to_one() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, Some(0)).await.unwrap();
    post.cast_up(Some(&user(2)), None, Some(-3)).await.unwrap();

    assert!(harness.repository.all_votes().await.iter().all(|vote| vote.vote_weight == 1));
    assert_eq!(post.weighted_total(true, None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_votes_add_rows() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast(Some(&voter), VoteArgs::up().duplicate(true)).await.unwrap();
    post.cast(Some(&voter), VoteArgs::up().duplicate(true)).await.unwrap();
    post.cast(Some(&voter), VoteArgs::down().duplicate(true)).await.unwrap();

    let votes = harness.repository.all_votes().await;
    assert_eq!(votes.len(), 3);
    assert_eq!(votes[0].uniqueness_token, "");
    assert_ne!(votes[1].uniqueness_token, votes[2].uniqueness_token);
    assert_eq!(post.count_votes_total(true, None).await.unwrap(), 3);
}

#[tokio::test]
async fn test_revote_after_duplicates_updates_the_latest() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast(Some(&voter), VoteArgs::up().duplicate(true)).await.unwrap();
    post.cast(Some(&voter), VoteArgs::up().duplicate(true)).await.unwrap();
    post.cast_down(Some(&voter), None, None).await.unwrap();

    let votes = harness.repository.all_votes().await;
    assert_eq!(votes.len(), 2);
    assert!(votes[0].vote_flag);
    assert!(!votes[1].vote_flag);
}

#[tokio::test]
async fn test_scopes_are_counted_independently() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast_up(Some(&voter), Some("weekly"), None).await.unwrap();
    post.cast_down(Some(&voter), Some("monthly"), None).await.unwrap();

    assert_eq!(harness.repository.all_votes().await.len(), 2);
    assert_eq!(post.count_votes_up(true, Some("weekly")).await.unwrap(), 1);
    assert_eq!(post.count_votes_down(true, Some("weekly")).await.unwrap(), 0);
    assert_eq!(post.count_votes_down(true, Some("monthly")).await.unwrap(), 1);

    let weekly = post.find_votes_for(Some("weekly")).await.unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].vote_scope.as_deref(), Some("weekly"));
}

#[tokio::test]
async fn test_unscoped_tallies_cover_every_scope() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, None).await.unwrap();
    post.cast_up(Some(&user(1)), Some("weekly"), None).await.unwrap();

    assert_eq!(post.count_votes_total(true, None).await.unwrap(), 2);
    assert_eq!(post.find_votes_for(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_votes_on_one_record_do_not_leak_to_another() {
    let harness = Harness::plain().await;
    let mut first = harness.post(1);
    let second = harness.post(2);
    let voter = user(1);

    first.cast_up(Some(&voter), None, None).await.unwrap();

    assert_eq!(second.count_votes_total(true, None).await.unwrap(), 0);
    assert!(!second.voted_on_by(&voter).await.unwrap());
    assert!(first.voted_on_by(&voter).await.unwrap());
}

#[tokio::test]
async fn test_uncast_only_removes_the_given_scope() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    let voter = user(1);

    post.cast_up(Some(&voter), None, None).await.unwrap();
    post.cast_up(Some(&voter), Some("rank"), None).await.unwrap();
    post.cast_up(Some(&voter), Some("weekly"), None).await.unwrap();

    assert!(post.uncast(Some(&voter), Some("rank")).await.unwrap());

    let scopes: Vec<Option<String>> = harness
        .repository
        .all_votes()
        .await
        .into_iter()
        .map(|vote| vote.vote_scope)
        .collect();
    assert_eq!(scopes, vec![None, Some("weekly".to_string())]);
}

#[tokio::test]
async fn test_uncast_without_votes_succeeds() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    assert!(post.uncast(Some(&user(1)), None).await.unwrap());
    assert!(!post.vote_registered());
}

#[tokio::test]
async fn test_vote_predicates() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, None).await.unwrap();
    post.cast_down(Some(&user(2)), Some("weekly"), None).await.unwrap();

    assert!(post.voted_up_by(&user(1)).await.unwrap());
    assert!(!post.voted_down_by(&user(1)).await.unwrap());
    assert!(post.voted_down_by(&user(2)).await.unwrap());
    assert!(post.voted_on_by(&user(2)).await.unwrap());
    assert!(!post.voted_on_by(&user(3)).await.unwrap());
}

#[tokio::test]
async fn test_vote_collections_and_voters() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, None).await.unwrap();
    post.cast_down(Some(&user(2)), None, None).await.unwrap();
    post.cast_up(Some(&user(3)), Some("weekly"), None).await.unwrap();
    post.cast_up(Some(&user(1)), Some("weekly"), None).await.unwrap();

    assert_eq!(post.get_up_votes(None).await.unwrap().len(), 3);
    assert_eq!(post.get_down_votes(None).await.unwrap().len(), 1);
    assert_eq!(post.voters(None).await.unwrap(), vec![user(1), user(2), user(3)]);
    assert_eq!(post.up_voters(Some("weekly")).await.unwrap(), vec![user(3), user(1)]);
    assert_eq!(post.down_voters(None).await.unwrap(), vec![user(2)]);
}

#[tokio::test]
async fn test_score_and_weighted_tallies() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, Some(5)).await.unwrap();
    post.cast_up(Some(&user(2)), None, Some(1)).await.unwrap();
    post.cast_down(Some(&user(3)), None, Some(2)).await.unwrap();

    assert_eq!(post.count_votes_score(true, None).await.unwrap(), 1);
    assert_eq!(post.weighted_total(true, None).await.unwrap(), 8);
    assert_eq!(post.weighted_score(true, None).await.unwrap(), 4);
    assert_eq!(post.weighted_average(true, None).await.unwrap(), 4.0 / 3.0);
    assert_eq!(post.weighted_average(true, Some("weekly")).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_destroy_votes_for_with_bulk_delete() {
    let harness = Harness::plain().await;
    let mut first = harness.post(1);
    let mut second = harness.post(2);

    first.cast_up(Some(&user(1)), None, None).await.unwrap();
    first.cast_up(Some(&user(2)), Some("weekly"), None).await.unwrap();
    second.cast_up(Some(&user(1)), None, None).await.unwrap();

    assert_eq!(first.destroy_votes_for().await.unwrap(), 2);

    let votes = harness.repository.all_votes().await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].votable, post_ref(2));
}

#[tokio::test]
async fn test_destroy_votes_for_one_by_one() {
    let harness = Harness::new(VotableOptions::new("Post", "posts").dependent("destroy")).await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, None).await.unwrap();
    post.cast_down(Some(&user(2)), None, None).await.unwrap();

    assert_eq!(post.destroy_votes_for().await.unwrap(), 2);
    assert!(harness.repository.all_votes().await.is_empty());
}

#[tokio::test]
async fn test_best_and_worst_rankings() {
    let harness = Harness::plain().await;
    let mut first = harness.post(1);
    let mut second = harness.post(2);
    let mut third = harness.post(3);

    first.cast_down(Some(&user(1)), None, None).await.unwrap();
    second.cast_up(Some(&user(1)), None, None).await.unwrap();
    second.cast_up(Some(&user(2)), None, None).await.unwrap();
    third.cast_up(Some(&user(1)), None, None).await.unwrap();

    let best = searchable::best(&*harness.repository, &harness.post_type, 2).await.unwrap();
    let best_ids: Vec<i64> = best.iter().map(|ranked| ranked.votable.id()).collect();
    assert_eq!(best_ids, vec![2, 3]);
    assert_eq!(best[0].score, 2);

    let worst = searchable::worst(&*harness.repository, &harness.post_type, 10).await.unwrap();
    let worst_ids: Vec<i64> = worst.iter().map(|ranked| ranked.votable.id()).collect();
    assert_eq!(worst_ids, vec![1, 3, 2]);
}

#[tokio::test]
async fn test_uncast_of_nothing_clears_registered_flag() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast_up(Some(&user(1)), None, None).await.unwrap();
    assert!(post.vote_registered());

    assert!(post.uncast(Some(&user(2)), None).await.unwrap());
    assert!(!post.vote_registered());
    assert_eq!(harness.repository.all_votes().await.len(), 1);
}

#[tokio::test]
async fn test_negative_ranking_limit_returns_nothing() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);
    post.cast_up(Some(&user(1)), None, None).await.unwrap();

    assert!(searchable::best(&*harness.repository, &harness.post_type, -1).await.unwrap().is_empty());
    assert!(searchable::worst(&*harness.repository, &harness.post_type, -5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_aliases_delegate() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.liked_by(&user(1)).await.unwrap();
    post.upvote_by(&user(2)).await.unwrap();
    post.disliked_by(&user(3)).await.unwrap();
    assert_eq!(post.get_likes().await.unwrap().len(), 2);
    assert_eq!(post.get_dislikes().await.unwrap().len(), 1);

    post.downvote_by(&user(1)).await.unwrap();
    post.unliked_by(&user(2)).await.unwrap();
    assert_eq!(post.get_likes().await.unwrap().len(), 0);
    assert_eq!(post.get_dislikes().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_words_are_up_votes() {
    let harness = Harness::plain().await;
    let mut post = harness.post(1);

    post.cast(Some(&user(1)), VoteArgs::new("xyzzy")).await.unwrap();
    post.cast(Some(&user(2)), VoteArgs::new("bad")).await.unwrap();

    assert!(post.voted_up_by(&user(1)).await.unwrap());
    assert!(post.voted_down_by(&user(2)).await.unwrap());
}

#[tokio::test]
async fn test_records_without_cache_columns_need_no_row() {
    let harness = Harness::new(VotableOptions::new("Post", "posts").cache_columns(CacheColumns::new())).await;
    let mut missing = harness.post(42);

    assert!(missing.cast_up(Some(&user(1)), None, None).await.unwrap());
    assert_eq!(missing.count_votes_total(false, None).await.unwrap(), 1);
}
