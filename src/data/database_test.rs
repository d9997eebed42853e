//! Database tests

use std::collections::BTreeSet;
use std::sync::Arc;

use super::*;
use crate::error::AppError;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("test.db");
    let db = Database::connect(&db_path, 2).await.unwrap();
    (db, temp_dir)
}

async fn insert_tweet(db: &Database, user_id: i64, content: &str) -> Tweet {
    let mut tx = db.begin().await.unwrap();
    let tweet = queries::insert_tweet(&mut tx, user_id, content).await.unwrap();
    tx.commit().await.unwrap();
    tweet
}

async fn insert_media(db: &Database, path: &str) -> Media {
    let mut tx = db.begin().await.unwrap();
    let media = queries::insert_media(&mut tx, path).await.unwrap();
    tx.commit().await.unwrap();
    media
}

#[tokio::test]
async fn test_database_connection_creates_parent_dir() {
    let (_db, temp_dir) = create_test_db().await;
    assert!(temp_dir.path().join("nested").join("test.db").exists());
}

#[tokio::test]
async fn test_find_user_by_key() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "alice-key").await.unwrap();

    let profile = db.find_user_by_key("alice-key").await.unwrap().unwrap();
    assert_eq!(profile.id(), alice.id);
    assert_eq!(profile.user.username, "alice");

    assert!(db.find_user_by_key("wrong").await.unwrap().is_none());
    assert!(db.find_user_by_key("").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected() {
    let (db, _temp_dir) = create_test_db().await;
    db.create_user("alice", "k1").await.unwrap();

    assert!(matches!(
        db.create_user("alice", "k2").await,
        Err(AppError::Database(_))
    ));
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;

    let first = db.ensure_user("test user", "test").await.unwrap();
    let second = db.ensure_user("test user", "test").await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_follow_edges_load_both_sides() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();
    let bob = db.create_user("bob", "b").await.unwrap();

    let mut tx = db.begin().await.unwrap();
    assert!(queries::insert_follow(&mut tx, alice.id, bob.id).await.unwrap());
    assert!(!queries::insert_follow(&mut tx, alice.id, bob.id).await.unwrap());
    tx.commit().await.unwrap();

    let alice_profile = db.find_user_by_id(alice.id).await.unwrap();
    let bob_profile = db.find_user_by_id(bob.id).await.unwrap();

    assert_eq!(alice_profile.following, vec![UserRef::from(&bob)]);
    assert!(alice_profile.followers.is_empty());
    assert_eq!(bob_profile.followers, vec![UserRef::from(&alice)]);
    assert!(bob_profile.following.is_empty());
}

#[tokio::test]
async fn test_self_follow_violates_check() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();

    let mut tx = db.begin().await.unwrap();
    assert!(matches!(
        queries::insert_follow(&mut tx, alice.id, alice.id).await,
        Err(AppError::Database(_))
    ));
}

#[tokio::test]
async fn test_find_user_by_id_missing() {
    let (db, _temp_dir) = create_test_db().await;

    let error = db.find_user_by_id(404).await.unwrap_err();
    assert!(matches!(error, AppError::NotFound(message) if message == queries::USER_NOT_FOUND));
}

#[tokio::test]
async fn test_attach_media_only_once() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();
    let media = insert_media(&db, "cat.png").await;

    let first = insert_tweet(&db, alice.id, "first").await;
    let second = insert_tweet(&db, alice.id, "second").await;

    let ids = BTreeSet::from([media.id, 999]);

    let mut tx = db.begin().await.unwrap();
    let attached = queries::attach_media(&mut tx, first.id, &ids).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(attached, vec![media.id]);

    let mut tx = db.begin().await.unwrap();
    let attached = queries::attach_media(&mut tx, second.id, &ids).await.unwrap();
    tx.commit().await.unwrap();
    assert!(attached.is_empty());

    let stored = db.find_media_by_id(media.id).await.unwrap().unwrap();
    assert_eq!(stored.state(), MediaState::Attached(first.id));
    assert_eq!(db.find_media_by_tweet(first.id).await.unwrap(), vec![stored]);
    assert!(db.find_media_by_tweet(second.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_tweet_cascade_removes_likes_and_media() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();
    let bob = db.create_user("bob", "b").await.unwrap();
    let media = insert_media(&db, "dog.jpg").await;
    let tweet = insert_tweet(&db, alice.id, "bye").await;

    let mut tx = db.begin().await.unwrap();
    queries::attach_media(&mut tx, tweet.id, &BTreeSet::from([media.id]))
        .await
        .unwrap();
    queries::insert_like(&mut tx, bob.id, tweet.id).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.begin().await.unwrap();
    let removed = queries::delete_tweet_cascade(&mut tx, tweet.id).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].media_path, "dog.jpg");
    assert!(matches!(
        db.find_tweet_by_id(tweet.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(db.find_media_by_id(media.id).await.unwrap().is_none());
    assert_eq!(db.count_likes(tweet.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_uncommitted_transaction_rolls_back() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();

    let tweet_id = {
        let mut tx = db.begin().await.unwrap();
        queries::insert_tweet(&mut tx, alice.id, "never committed")
            .await
            .unwrap()
            .id
    };

    assert!(db.find_tweet_by_id(tweet_id).await.is_err());
    assert!(db.list_all_tweets().await.unwrap().is_empty());

    // The write lock went away with the dropped transaction
    let after = insert_tweet(&db, alice.id, "after").await;
    assert_eq!(db.list_all_tweets().await.unwrap()[0].tweet.id, after.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_read_then_write_transactions_all_commit() {
    let temp_dir = TempDir::new().unwrap();
    let db = Arc::new(
        Database::connect(&temp_dir.path().join("busy.db"), 8)
            .await
            .unwrap(),
    );
    let alice = db.create_user("alice", "a").await.unwrap();
    let tweet = insert_tweet(&db, alice.id, "popular").await;

    let mut likers = Vec::new();
    for n in 0..24 {
        let user = db
            .create_user(&format!("user{n}"), &format!("key{n}"))
            .await
            .unwrap();
        likers.push(user.id);
    }

    let tweet_id = tweet.id;
    let tasks = likers.iter().map(|&user_id| {
        let db = db.clone();
        tokio::spawn(async move {
            let mut tx = db.begin().await?;
            queries::find_tweet_by_id(&mut tx, tweet_id).await?;
            let existing = queries::find_like(&mut tx, user_id, tweet_id).await?;
            tokio::task::yield_now().await;
            let inserted = queries::insert_like(&mut tx, user_id, tweet_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>(existing.is_none() && inserted)
        })
    });

    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().unwrap());
    }
    assert_eq!(db.count_likes(tweet_id).await.unwrap(), 24);
}

#[tokio::test]
async fn test_like_pair_is_unique() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();
    let bob = db.create_user("bob", "b").await.unwrap();
    let tweet = insert_tweet(&db, alice.id, "hello").await;

    let mut tx = db.begin().await.unwrap();
    assert!(queries::insert_like(&mut tx, bob.id, tweet.id).await.unwrap());
    assert!(!queries::insert_like(&mut tx, bob.id, tweet.id).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!(db.count_likes(tweet.id).await.unwrap(), 1);

    let like = db.find_like(bob.id, tweet.id).await.unwrap().unwrap();
    let by_id = db.find_like_by_id(like.id).await.unwrap().unwrap();
    assert_eq!(like, by_id);
}

#[tokio::test]
async fn test_listings_are_newest_first_with_relations() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();
    let bob = db.create_user("bob", "b").await.unwrap();
    let carol = db.create_user("carol", "c").await.unwrap();

    let t1 = insert_tweet(&db, alice.id, "one").await;
    let t2 = insert_tweet(&db, bob.id, "two").await;
    let t3 = insert_tweet(&db, carol.id, "three").await;

    let mut tx = db.begin().await.unwrap();
    queries::insert_like(&mut tx, bob.id, t1.id).await.unwrap();
    queries::insert_like(&mut tx, carol.id, t1.id).await.unwrap();
    queries::insert_follow(&mut tx, alice.id, bob.id).await.unwrap();
    tx.commit().await.unwrap();

    let all = db.list_all_tweets().await.unwrap();
    let ids: Vec<i64> = all.iter().map(|details| details.tweet.id).collect();
    assert_eq!(ids, vec![t3.id, t2.id, t1.id]);

    let first = all.iter().find(|details| details.tweet.id == t1.id).unwrap();
    assert_eq!(first.author.username, "alice");
    let likers: Vec<&str> = first.likes.iter().map(|like| like.username.as_str()).collect();
    assert_eq!(likers, vec!["bob", "carol"]);

    // Alice sees her own tweet and bob's, not carol's
    let timeline = db.list_tweets_for_followed_and_self(alice.id).await.unwrap();
    let ids: Vec<i64> = timeline.iter().map(|details| details.tweet.id).collect();
    assert_eq!(ids, vec![t2.id, t1.id]);
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = db.create_user("alice", "a").await.unwrap();
    let bob = db.create_user("bob", "b").await.unwrap();

    let media = insert_media(&db, "alice.png").await;
    let alice_tweet = insert_tweet(&db, alice.id, "alice").await;
    let bob_tweet = insert_tweet(&db, bob.id, "bob").await;

    let mut tx = db.begin().await.unwrap();
    queries::attach_media(&mut tx, alice_tweet.id, &BTreeSet::from([media.id]))
        .await
        .unwrap();
    queries::insert_like(&mut tx, bob.id, alice_tweet.id).await.unwrap();
    queries::insert_like(&mut tx, alice.id, bob_tweet.id).await.unwrap();
    queries::insert_follow(&mut tx, bob.id, alice.id).await.unwrap();
    tx.commit().await.unwrap();

    let removed = db.delete_user(alice.id).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, media.id);

    let remaining = db.list_all_tweets().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].tweet.id, bob_tweet.id);
    assert!(remaining[0].likes.is_empty());

    let bob_profile = db.find_user_by_id(bob.id).await.unwrap();
    assert!(bob_profile.following.is_empty());

    assert!(matches!(
        db.delete_user(alice.id).await,
        Err(AppError::NotFound(_))
    ));
}
