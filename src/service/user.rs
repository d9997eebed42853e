//! User service
//!
//! Profile lookups and follow graph mutations.

use std::sync::Arc;

use crate::data::{Database, UserProfile, queries};
use crate::error::AppError;
use crate::metrics::FOLLOWS_TOTAL;

pub const FOLLOW_SELF: &str = "Unable to follow yourself";
pub const ALREADY_FOLLOWING: &str = "You already follow that user!";
pub const NOT_FOLLOWING: &str = "You are not following this user.";

/// User service
pub struct UserService {
    db: Arc<Database>,
}

impl UserService {
    /// Create new user service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get a user with followers and followings
    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AppError> {
        self.db.find_user_by_id(user_id).await
    }

    /// Add the edge `caller -> target`
    ///
    /// The duplicate check is a membership test on the caller's loaded
    /// following set; the primary key on `follows` backs it up.
    ///
    /// # Errors
    /// - `NotFound` if the target does not exist
    /// - `BadRequest` on self-follow or an existing edge
    pub async fn follow(&self, caller: &UserProfile, target_id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let target = queries::find_user_by_id(&mut tx, target_id).await?;
        if target.id() == caller.id() {
            return Err(AppError::BadRequest(FOLLOW_SELF.to_string()));
        }
        if caller.is_following(target.id()) {
            return Err(AppError::BadRequest(ALREADY_FOLLOWING.to_string()));
        }

        if !queries::insert_follow(&mut tx, caller.id(), target.id()).await? {
            return Err(AppError::BadRequest(ALREADY_FOLLOWING.to_string()));
        }

        tx.commit().await?;
        FOLLOWS_TOTAL.with_label_values(&["follow"]).inc();

        tracing::info!(
            follower_id = caller.id(),
            followee_id = target.id(),
            "Follow created"
        );

        Ok(())
    }

    /// Remove the edge `caller -> target`
    ///
    /// # Errors
    /// - `NotFound` if the target does not exist
    /// - `BadRequest` if there is no such edge
    pub async fn unfollow(&self, caller: &UserProfile, target_id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let target = queries::find_user_by_id(&mut tx, target_id).await?;
        if !caller.is_following(target.id()) {
            return Err(AppError::BadRequest(NOT_FOLLOWING.to_string()));
        }

        if !queries::delete_follow(&mut tx, caller.id(), target.id()).await? {
            return Err(AppError::BadRequest(NOT_FOLLOWING.to_string()));
        }

        tx.commit().await?;
        FOLLOWS_TOTAL.with_label_values(&["unfollow"]).inc();

        tracing::info!(
            follower_id = caller.id(),
            followee_id = target.id(),
            "Follow removed"
        );

        Ok(())
    }
}
