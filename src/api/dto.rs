//! API request and response DTOs

use serde::{Deserialize, Serialize};

use crate::data::MAX_TWEET_LENGTH;
use crate::error::AppError;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /tweets`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetRequest {
    pub tweet_data: String,
    #[serde(default)]
    pub tweet_media_ids: Option<Vec<i64>>,
}

impl CreateTweetRequest {
    /// Shape checks that run before any domain logic
    pub fn validate(&self) -> Result<(), AppError> {
        let length = self.tweet_data.chars().count();
        if length > MAX_TWEET_LENGTH {
            return Err(AppError::Validation(format!(
                "tweet_data must be at most {} characters, got {}",
                MAX_TWEET_LENGTH, length
            )));
        }
        Ok(())
    }

    pub fn media_ids(&self) -> &[i64] {
        self.tweet_media_ids.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Responses
// =============================================================================

/// `{"result": true}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: bool,
}

impl ResultResponse {
    pub fn ok() -> Self {
        Self { result: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    pub result: bool,
    pub media_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTweetResponse {
    pub result: bool,
    pub tweet_id: i64,
}

/// `{id, name}` reference to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRefView {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeView {
    pub user_id: i64,
    pub name: String,
}

/// Nested tweet view: tweet -> author -> media -> likes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetView {
    pub id: i64,
    pub content: String,
    /// Stored media paths
    pub attachments: Vec<String>,
    pub author: UserRefView,
    pub likes: Vec<LikeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetListResponse {
    pub result: bool,
    pub tweets: Vec<TweetView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub followers: Vec<UserRefView>,
    pub followings: Vec<UserRefView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub result: bool,
    pub user: UserView,
}
