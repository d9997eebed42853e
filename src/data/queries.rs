//! Query functions
//!
//! Every read and write against the schema lives here. Functions take a
//! plain `&mut SqliteConnection` so the same code runs on a pooled
//! connection or inside a request transaction.
//!
//! Relationship loading is explicit: user lookups always return the
//! follow edge sets, tweet listings always return author, media and likes,
//! each fetched with a fixed number of batch queries.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeSet, HashMap};

use super::models::*;
use crate::error::AppError;
use crate::metrics::record_query;

/// Message for a missing user
pub const USER_NOT_FOUND: &str = "User does not exist.";
/// Message for a missing tweet
pub const TWEET_NOT_FOUND: &str = "Tweet was not found!";

/// Upper bound of bound parameters per `IN (...)` clause
const IN_CLAUSE_CHUNK: usize = 500;

// =============================================================================
// Users
// =============================================================================

async fn load_profile(conn: &mut SqliteConnection, user: User) -> Result<UserProfile, AppError> {
    let followers = sqlx::query_as::<_, UserRef>(
        r#"
        SELECT u.id, u.username
        FROM follows f
        JOIN users u ON u.id = f.follower_id
        WHERE f.followee_id = ?
        ORDER BY u.id
        "#,
    )
    .bind(user.id)
    .fetch_all(&mut *conn)
    .await?;

    let following = sqlx::query_as::<_, UserRef>(
        r#"
        SELECT u.id, u.username
        FROM follows f
        JOIN users u ON u.id = f.followee_id
        WHERE f.follower_id = ?
        ORDER BY u.id
        "#,
    )
    .bind(user.id)
    .fetch_all(&mut *conn)
    .await?;
    record_query("SELECT", "follows");

    Ok(UserProfile {
        user,
        followers,
        following,
    })
}

/// Exact API key match. An empty key never matches.
pub async fn find_user_by_key(
    conn: &mut SqliteConnection,
    api_key: &str,
) -> Result<Option<UserProfile>, AppError> {
    if api_key.is_empty() {
        return Ok(None);
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, api_key, username FROM users WHERE api_key = ? ORDER BY id LIMIT 1",
    )
    .bind(api_key)
    .fetch_optional(&mut *conn)
    .await?;
    record_query("SELECT", "users");

    match user {
        Some(user) => Ok(Some(load_profile(conn, user).await?)),
        None => Ok(None),
    }
}

/// Look up a user by id, failing with `NotFound` when absent
pub async fn find_user_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<UserProfile, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT id, api_key, username FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
    record_query("SELECT", "users");

    load_profile(conn, user).await
}

pub async fn create_user(
    conn: &mut SqliteConnection,
    username: &str,
    api_key: &str,
) -> Result<User, AppError> {
    let result = sqlx::query("INSERT INTO users (api_key, username) VALUES (?, ?)")
        .bind(api_key)
        .bind(username)
        .execute(&mut *conn)
        .await?;
    record_query("INSERT", "users");

    Ok(User {
        id: result.last_insert_rowid(),
        api_key: api_key.to_string(),
        username: username.to_string(),
    })
}

/// Idempotent bootstrap: returns the existing user holding `api_key`
/// or creates one.
pub async fn ensure_user(
    conn: &mut SqliteConnection,
    username: &str,
    api_key: &str,
) -> Result<User, AppError> {
    let existing = sqlx::query_as::<_, User>(
        "SELECT id, api_key, username FROM users WHERE api_key = ? ORDER BY id LIMIT 1",
    )
    .bind(api_key)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(user) => Ok(user),
        None => create_user(conn, username, api_key).await,
    }
}

/// Delete a user with its likes, tweets (and their media and likes)
/// and follow edges, in that order.
///
/// # Returns
/// Media rows that belonged to the user's tweets
pub async fn delete_user(conn: &mut SqliteConnection, id: i64) -> Result<Vec<Media>, AppError> {
    let removed_media = sqlx::query_as::<_, Media>(
        r#"
        SELECT m.id, m.media_path, m.tweet_id
        FROM media m
        JOIN tweets t ON t.id = m.tweet_id
        WHERE t.user_id = ?
        ORDER BY m.id
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    sqlx::query(
        "DELETE FROM likes WHERE user_id = ? OR tweet_id IN (SELECT id FROM tweets WHERE user_id = ?)",
    )
    .bind(id)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM media WHERE tweet_id IN (SELECT id FROM tweets WHERE user_id = ?)")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM tweets WHERE user_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM follows WHERE follower_id = ? OR followee_id = ?")
        .bind(id)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    record_query("DELETE", "users");

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
    }

    Ok(removed_media)
}

// =============================================================================
// Follow edges
// =============================================================================

/// Insert the edge `follower -> followee`
///
/// # Returns
/// `false` if the edge already existed
pub async fn insert_follow(
    conn: &mut SqliteConnection,
    follower_id: i64,
    followee_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO follows (follower_id, followee_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(&mut *conn)
    .await?;
    record_query("INSERT", "follows");

    Ok(result.rows_affected() == 1)
}

/// Remove the edge `follower -> followee`
///
/// # Returns
/// `false` if there was no such edge
pub async fn delete_follow(
    conn: &mut SqliteConnection,
    follower_id: i64,
    followee_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
        .bind(follower_id)
        .bind(followee_id)
        .execute(&mut *conn)
        .await?;
    record_query("DELETE", "follows");

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Tweets
// =============================================================================

/// Look up a tweet by id, failing with `NotFound` when absent
pub async fn find_tweet_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Tweet, AppError> {
    let tweet = sqlx::query_as::<_, Tweet>(
        "SELECT id, user_id, content, created_at FROM tweets WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(TWEET_NOT_FOUND.to_string()))?;
    record_query("SELECT", "tweets");

    Ok(tweet)
}

pub async fn insert_tweet(
    conn: &mut SqliteConnection,
    user_id: i64,
    content: &str,
) -> Result<Tweet, AppError> {
    let created_at = Utc::now();
    let result = sqlx::query("INSERT INTO tweets (user_id, content, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(content)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    record_query("INSERT", "tweets");

    Ok(Tweet {
        id: result.last_insert_rowid(),
        user_id,
        content: content.to_string(),
        created_at,
    })
}

/// Delete a tweet after its likes and media, in that order.
///
/// # Returns
/// The media rows that were attached (their files still exist)
pub async fn delete_tweet_cascade(
    conn: &mut SqliteConnection,
    tweet_id: i64,
) -> Result<Vec<Media>, AppError> {
    let removed_media = find_media_by_tweet(&mut *conn, tweet_id).await?;

    sqlx::query("DELETE FROM likes WHERE tweet_id = ?")
        .bind(tweet_id)
        .execute(&mut *conn)
        .await?;
    record_query("DELETE", "likes");

    sqlx::query("DELETE FROM media WHERE tweet_id = ?")
        .bind(tweet_id)
        .execute(&mut *conn)
        .await?;
    record_query("DELETE", "media");

    let deleted = sqlx::query("DELETE FROM tweets WHERE id = ?")
        .bind(tweet_id)
        .execute(&mut *conn)
        .await?;
    record_query("DELETE", "tweets");

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(TWEET_NOT_FOUND.to_string()));
    }

    Ok(removed_media)
}

#[derive(sqlx::FromRow)]
struct TweetRow {
    id: i64,
    user_id: i64,
    content: String,
    created_at: chrono::DateTime<Utc>,
    author_name: String,
}

/// Every tweet, newest first, relations loaded
pub async fn list_all_tweets(conn: &mut SqliteConnection) -> Result<Vec<TweetDetails>, AppError> {
    let rows = sqlx::query_as::<_, TweetRow>(
        r#"
        SELECT t.id, t.user_id, t.content, t.created_at, u.username AS author_name
        FROM tweets t
        JOIN users u ON u.id = t.user_id
        ORDER BY t.created_at DESC, t.id DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    record_query("SELECT", "tweets");

    load_tweet_relations(conn, rows).await
}

/// Tweets authored by `user_id` or by anyone `user_id` follows,
/// newest first, relations loaded
pub async fn list_tweets_for_followed_and_self(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<TweetDetails>, AppError> {
    let rows = sqlx::query_as::<_, TweetRow>(
        r#"
        SELECT t.id, t.user_id, t.content, t.created_at, u.username AS author_name
        FROM tweets t
        JOIN users u ON u.id = t.user_id
        WHERE t.user_id = ?
           OR t.user_id IN (SELECT followee_id FROM follows WHERE follower_id = ?)
        ORDER BY t.created_at DESC, t.id DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    record_query("SELECT", "tweets");

    load_tweet_relations(conn, rows).await
}

/// Batch-load media and likes for the given tweets, preserving row order.
async fn load_tweet_relations(
    conn: &mut SqliteConnection,
    rows: Vec<TweetRow>,
) -> Result<Vec<TweetDetails>, AppError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let tweet_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut media_by_tweet: HashMap<i64, Vec<Media>> = HashMap::new();
    let mut likes_by_tweet: HashMap<i64, Vec<LikeEntry>> = HashMap::new();

    for chunk in tweet_ids.chunks(IN_CLAUSE_CHUNK) {
        let mut query_builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, media_path, tweet_id FROM media WHERE tweet_id IN (",
        );
        {
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
        }
        query_builder.push(") ORDER BY id");

        let media = query_builder
            .build_query_as::<Media>()
            .fetch_all(&mut *conn)
            .await?;
        for item in media {
            if let Some(tweet_id) = item.tweet_id {
                media_by_tweet.entry(tweet_id).or_default().push(item);
            }
        }

        let mut query_builder = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT l.tweet_id, l.user_id, u.username
            FROM likes l
            JOIN users u ON u.id = l.user_id
            WHERE l.tweet_id IN ("#,
        );
        {
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
        }
        query_builder.push(") ORDER BY l.id");

        let likes = query_builder
            .build_query_as::<LikeEntry>()
            .fetch_all(&mut *conn)
            .await?;
        for like in likes {
            likes_by_tweet.entry(like.tweet_id).or_default().push(like);
        }
    }
    record_query("SELECT", "media");
    record_query("SELECT", "likes");

    Ok(rows
        .into_iter()
        .map(|row| TweetDetails {
            media: media_by_tweet.remove(&row.id).unwrap_or_default(),
            likes: likes_by_tweet.remove(&row.id).unwrap_or_default(),
            author: UserRef {
                id: row.user_id,
                username: row.author_name,
            },
            tweet: Tweet {
                id: row.id,
                user_id: row.user_id,
                content: row.content,
                created_at: row.created_at,
            },
        })
        .collect())
}

// =============================================================================
// Media
// =============================================================================

/// Insert a detached media row
pub async fn insert_media(conn: &mut SqliteConnection, media_path: &str) -> Result<Media, AppError> {
    let result = sqlx::query("INSERT INTO media (media_path, tweet_id) VALUES (?, NULL)")
        .bind(media_path)
        .execute(&mut *conn)
        .await?;
    record_query("INSERT", "media");

    Ok(Media {
        id: result.last_insert_rowid(),
        media_path: media_path.to_string(),
        tweet_id: None,
    })
}

pub async fn find_media_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Media>, AppError> {
    let media = sqlx::query_as::<_, Media>("SELECT id, media_path, tweet_id FROM media WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(media)
}

/// Media rows whose id is in `ids`; unknown ids are skipped
pub async fn find_media_by_ids(
    conn: &mut SqliteConnection,
    ids: &BTreeSet<i64>,
) -> Result<Vec<Media>, AppError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<i64> = ids.iter().copied().collect();
    let mut all_media = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(IN_CLAUSE_CHUNK) {
        let mut query_builder =
            QueryBuilder::<Sqlite>::new("SELECT id, media_path, tweet_id FROM media WHERE id IN (");
        {
            let mut separated = query_builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
        }
        query_builder.push(") ORDER BY id");

        let media = query_builder
            .build_query_as::<Media>()
            .fetch_all(&mut *conn)
            .await?;
        all_media.extend(media);
    }
    record_query("SELECT", "media");

    Ok(all_media)
}

/// Media attached to a tweet
pub async fn find_media_by_tweet(
    conn: &mut SqliteConnection,
    tweet_id: i64,
) -> Result<Vec<Media>, AppError> {
    let media = sqlx::query_as::<_, Media>(
        "SELECT id, media_path, tweet_id FROM media WHERE tweet_id = ? ORDER BY id",
    )
    .bind(tweet_id)
    .fetch_all(&mut *conn)
    .await?;
    record_query("SELECT", "media");

    Ok(media)
}

/// Attach detached media rows to `tweet_id`.
///
/// Unknown ids and rows already attached (to any tweet) are left alone.
/// The `tweet_id IS NULL` guard makes the detached -> attached transition
/// happen at most once per row.
///
/// # Returns
/// Ids of the rows attached by this call
pub async fn attach_media(
    conn: &mut SqliteConnection,
    tweet_id: i64,
    media_ids: &BTreeSet<i64>,
) -> Result<Vec<i64>, AppError> {
    let candidates = find_media_by_ids(&mut *conn, media_ids).await?;
    let mut attached = Vec::new();

    for media in candidates {
        if media.state() != MediaState::Detached {
            continue;
        }

        let updated =
            sqlx::query("UPDATE media SET tweet_id = ? WHERE id = ? AND tweet_id IS NULL")
                .bind(tweet_id)
                .bind(media.id)
                .execute(&mut *conn)
                .await?;

        if updated.rows_affected() == 1 {
            attached.push(media.id);
        }
    }
    record_query("UPDATE", "media");

    Ok(attached)
}

// =============================================================================
// Likes
// =============================================================================

/// The like `user_id` left on `tweet_id`, if any
pub async fn find_like(
    conn: &mut SqliteConnection,
    user_id: i64,
    tweet_id: i64,
) -> Result<Option<Like>, AppError> {
    let like = sqlx::query_as::<_, Like>(
        "SELECT id, user_id, tweet_id FROM likes WHERE user_id = ? AND tweet_id = ?",
    )
    .bind(user_id)
    .bind(tweet_id)
    .fetch_optional(&mut *conn)
    .await?;
    record_query("SELECT", "likes");

    Ok(like)
}

pub async fn find_like_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Like>, AppError> {
    let like = sqlx::query_as::<_, Like>("SELECT id, user_id, tweet_id FROM likes WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(like)
}

/// Insert a like. A (user, tweet) pair that already exists is a no-op.
///
/// # Returns
/// `true` if a row was inserted
pub async fn insert_like(
    conn: &mut SqliteConnection,
    user_id: i64,
    tweet_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "INSERT INTO likes (user_id, tweet_id) VALUES (?, ?) ON CONFLICT (user_id, tweet_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(tweet_id)
    .execute(&mut *conn)
    .await?;
    record_query("INSERT", "likes");

    Ok(result.rows_affected() == 1)
}

pub async fn delete_like(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM likes WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    record_query("DELETE", "likes");

    Ok(())
}
