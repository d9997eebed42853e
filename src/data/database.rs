//! SQLite connection pool
//!
//! The pool is built once at startup and handed to every request through
//! `AppState`. Reads go through the convenience methods here; mutating
//! requests open a transaction with [`Database::begin`] and run the
//! functions from [`super::queries`] against it.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::Duration;

use super::models::*;
use super::queries;
use crate::error::AppError;

const TX_CONNECTION: &str = "transaction connection is held until commit or drop";

/// Per-request write scope opened with `BEGIN IMMEDIATE`.
///
/// Holds the write lock from `BEGIN`, so other writers wait on the busy
/// timeout. Dropping it without `commit()` closes the connection, which
/// rolls back.
pub struct Tx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl Tx {
    async fn begin(pool: &Pool<Sqlite>) -> Result<Self, AppError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    /// Commit and hand the connection back to the pool.
    pub async fn commit(mut self) -> Result<(), AppError> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        if let Err(error) = sqlx::query("COMMIT").execute(&mut *conn).await {
            if sqlx::query("ROLLBACK").execute(&mut *conn).await.is_err() {
                drop(conn.detach());
            }
            return Err(error.into());
        }

        Ok(())
    }
}

impl Deref for Tx {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_deref().expect(TX_CONNECTION)
    }
}

impl DerefMut for Tx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_deref_mut().expect(TX_CONNECTION)
    }
}

impl Drop for Tx {
    fn drop(&mut self) {
        // A pooled connection would keep the open transaction. Closing it rolls back.
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Open a write transaction for one request.
    pub async fn begin(&self) -> Result<Tx, AppError> {
        Tx::begin(&self.pool).await
    }

    /// Close every pooled connection. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Resolve an API key to its user, follow edges loaded
    pub async fn find_user_by_key(&self, api_key: &str) -> Result<Option<UserProfile>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_user_by_key(&mut conn, api_key).await
    }

    /// Get user by ID, follow edges loaded
    pub async fn find_user_by_id(&self, id: i64) -> Result<UserProfile, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_user_by_id(&mut conn, id).await
    }

    /// Insert a new user
    pub async fn create_user(&self, username: &str, api_key: &str) -> Result<User, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::create_user(&mut conn, username, api_key).await
    }

    /// Create the user unless one with this API key already exists
    pub async fn ensure_user(&self, username: &str, api_key: &str) -> Result<User, AppError> {
        let mut tx = self.begin().await?;
        let user = queries::ensure_user(&mut tx, username, api_key).await?;
        tx.commit().await?;
        Ok(user)
    }

    /// Delete a user and everything it owns
    ///
    /// # Returns
    /// Media rows removed with the user's tweets (their files still exist)
    pub async fn delete_user(&self, id: i64) -> Result<Vec<Media>, AppError> {
        let mut tx = self.begin().await?;
        let removed = queries::delete_user(&mut tx, id).await?;
        tx.commit().await?;
        Ok(removed)
    }

    // =========================================================================
    // Tweets
    // =========================================================================

    /// Get tweet by ID
    pub async fn find_tweet_by_id(&self, id: i64) -> Result<Tweet, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_tweet_by_id(&mut conn, id).await
    }

    /// Every tweet, newest first, with author, media and likes loaded
    pub async fn list_all_tweets(&self) -> Result<Vec<TweetDetails>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::list_all_tweets(&mut conn).await
    }

    /// Tweets by `user_id` and the users it follows, newest first
    pub async fn list_tweets_for_followed_and_self(
        &self,
        user_id: i64,
    ) -> Result<Vec<TweetDetails>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::list_tweets_for_followed_and_self(&mut conn, user_id).await
    }

    // =========================================================================
    // Media
    // =========================================================================

    /// Get media by ID
    pub async fn find_media_by_id(&self, id: i64) -> Result<Option<Media>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_media_by_id(&mut conn, id).await
    }

    /// Get all media attached to a tweet
    pub async fn find_media_by_tweet(&self, tweet_id: i64) -> Result<Vec<Media>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_media_by_tweet(&mut conn, tweet_id).await
    }
}

// =============================================================================
// Test helpers
// =============================================================================

#[cfg(test)]
impl Database {
    pub(crate) async fn find_like_by_id(&self, id: i64) -> Result<Option<Like>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_like_by_id(&mut conn, id).await
    }

    pub(crate) async fn find_like(
        &self,
        user_id: i64,
        tweet_id: i64,
    ) -> Result<Option<Like>, AppError> {
        let mut conn = self.pool.acquire().await?;
        queries::find_like(&mut conn, user_id, tweet_id).await
    }

    pub(crate) async fn count_likes(&self, tweet_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE tweet_id = ?")
            .bind(tweet_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
