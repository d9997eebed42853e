//! Tweet service
//!
//! Handles tweet and like operations: create, delete, like, unlike
//! and the two tweet listings.
//!
//! Each mutating call runs in one transaction. Any `?` before `commit()`
//! drops the transaction, which rolls it back.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::data::{Database, LikeOutcome, Tweet, TweetDetails, UserProfile, queries};
use crate::error::AppError;
use crate::metrics::{LIKES_TOTAL, TWEETS_CREATED_TOTAL, TWEETS_DELETED_TOTAL};
use crate::storage::MediaStorage;

/// Message when the caller tries to delete someone else's tweet
pub const DELETE_FORBIDDEN: &str = "Sorry, you can't delete tweets created by another user.";
/// Message when unliking a tweet the caller does not like
pub const LIKE_NOT_FOUND: &str = "You already do not like that tweet.";

/// Tweet service
pub struct TweetService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl TweetService {
    /// Create new tweet service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Create a new tweet owned by `caller`
    ///
    /// # Arguments
    /// * `content` - Body text (already validated)
    /// * `media_ids` - Previously uploaded media to attach
    ///
    /// Unknown or already attached media ids are skipped silently.
    pub async fn create(
        &self,
        caller: &UserProfile,
        content: &str,
        media_ids: &[i64],
    ) -> Result<Tweet, AppError> {
        let mut tx = self.db.begin().await?;

        let tweet = queries::insert_tweet(&mut tx, caller.id(), content).await?;

        let requested: BTreeSet<i64> = media_ids.iter().copied().collect();
        let attached = if requested.is_empty() {
            Vec::new()
        } else {
            queries::attach_media(&mut tx, tweet.id, &requested).await?
        };

        tx.commit().await?;
        TWEETS_CREATED_TOTAL.inc();

        tracing::info!(
            tweet_id = tweet.id,
            user_id = caller.id(),
            requested_media = requested.len(),
            attached_media = attached.len(),
            "Tweet created"
        );

        Ok(tweet)
    }

    /// Delete a tweet owned by `caller`, its media rows and likes.
    ///
    /// Stored files are unlinked after the commit; failures there are logged only.
    ///
    /// # Errors
    /// `NotFound` if the tweet is absent, `Forbidden` if the caller is not the owner
    pub async fn delete(&self, caller: &UserProfile, tweet_id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let tweet = queries::find_tweet_by_id(&mut tx, tweet_id).await?;
        if tweet.user_id != caller.id() {
            return Err(AppError::Forbidden(DELETE_FORBIDDEN.to_string()));
        }

        let removed_media = queries::delete_tweet_cascade(&mut tx, tweet.id).await?;
        tx.commit().await?;
        TWEETS_DELETED_TOTAL.inc();

        let unlinks = removed_media
            .iter()
            .map(|media| self.storage.delete(&media.media_path));
        for (media, result) in removed_media
            .iter()
            .zip(futures::future::join_all(unlinks).await)
        {
            if let Err(error) = result {
                tracing::warn!(%error, path = %media.media_path, "Failed to remove media file");
            }
        }

        tracing::info!(
            tweet_id,
            user_id = caller.id(),
            removed_media = removed_media.len(),
            "Tweet deleted"
        );

        Ok(())
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Like a tweet
    ///
    /// Liking twice or liking one's own tweet is a silent no-op.
    ///
    /// # Errors
    /// `NotFound` if the tweet is absent
    pub async fn like(&self, caller: &UserProfile, tweet_id: i64) -> Result<LikeOutcome, AppError> {
        let mut tx = self.db.begin().await?;

        let tweet = queries::find_tweet_by_id(&mut tx, tweet_id).await?;
        let outcome = if queries::find_like(&mut tx, caller.id(), tweet.id)
            .await?
            .is_some()
        {
            LikeOutcome::AlreadyLiked
        } else if tweet.user_id == caller.id() {
            LikeOutcome::OwnTweet
        } else if queries::insert_like(&mut tx, caller.id(), tweet.id).await? {
            LikeOutcome::Created
        } else {
            // Pair already present
            LikeOutcome::AlreadyLiked
        };

        tx.commit().await?;
        LIKES_TOTAL.with_label_values(&[outcome.as_str()]).inc();

        tracing::debug!(
            tweet_id,
            user_id = caller.id(),
            outcome = outcome.as_str(),
            "Like processed"
        );

        Ok(outcome)
    }

    /// Remove the caller's like from a tweet
    ///
    /// # Errors
    /// `NotFound` if the tweet is absent or the caller does not like it
    pub async fn unlike(&self, caller: &UserProfile, tweet_id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let tweet = queries::find_tweet_by_id(&mut tx, tweet_id).await?;
        let like = queries::find_like(&mut tx, caller.id(), tweet.id)
            .await?
            .ok_or_else(|| AppError::NotFound(LIKE_NOT_FOUND.to_string()))?;

        queries::delete_like(&mut tx, like.id).await?;
        tx.commit().await?;
        LIKES_TOTAL.with_label_values(&["removed"]).inc();

        Ok(())
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Every tweet, newest first
    pub async fn list_all(&self) -> Result<Vec<TweetDetails>, AppError> {
        self.db.list_all_tweets().await
    }

    /// Tweets by `user_id` and the users it follows, newest first
    ///
    /// # Errors
    /// `NotFound` if the user does not exist
    pub async fn timeline(&self, user_id: i64) -> Result<Vec<TweetDetails>, AppError> {
        let profile = self.db.find_user_by_id(user_id).await?;
        self.db.list_tweets_for_followed_and_self(profile.id()).await
    }
}
