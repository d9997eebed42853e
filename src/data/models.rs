//! Data models
//!
//! Rust structs representing database rows and the eagerly loaded
//! aggregates built from them. All ids are SQLite integer row ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// User
// =============================================================================

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Opaque bearer credential
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Unique display name
    pub username: String,
}

/// Minimal user projection used inside nested views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// A user together with both sides of its follow edges.
///
/// Always produced by the data layer with the edge sets already loaded.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    /// Users following this user
    pub followers: Vec<UserRef>,
    /// Users this user follows
    pub following: Vec<UserRef>,
}

impl UserProfile {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    /// Membership test on the loaded following set
    pub fn is_following(&self, user_id: i64) -> bool {
        self.following.iter().any(|followee| followee.id == user_id)
    }
}

// =============================================================================
// Tweet
// =============================================================================

/// Longest accepted tweet body, in characters
pub const MAX_TWEET_LENGTH: usize = 2500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tweet {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub content: String,
    /// Server-assigned at insert
    pub created_at: DateTime<Utc>,
}

/// A tweet with author, media and likes loaded
#[derive(Debug, Clone)]
pub struct TweetDetails {
    pub tweet: Tweet,
    pub author: UserRef,
    pub media: Vec<Media>,
    pub likes: Vec<LikeEntry>,
}

// =============================================================================
// Media
// =============================================================================

/// An uploaded file reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Media {
    pub id: i64,
    /// Path relative to the media directory
    pub media_path: String,
    /// Owning tweet (None while detached)
    pub tweet_id: Option<i64>,
}

/// Attachment state of a media row.
///
/// The only transition is `Detached -> Attached`; attached media never moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Detached,
    Attached(i64),
}

impl Media {
    pub fn state(&self) -> MediaState {
        match self.tweet_id {
            Some(tweet_id) => MediaState::Attached(tweet_id),
            None => MediaState::Detached,
        }
    }
}

// =============================================================================
// Likes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub tweet_id: i64,
}

/// A like joined with the liker's name
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LikeEntry {
    pub tweet_id: i64,
    pub user_id: i64,
    pub username: String,
}

/// What a like request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Created,
    AlreadyLiked,
    /// Self-likes are ignored, not rejected
    OwnTweet,
}

impl LikeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyLiked => "already_liked",
            Self::OwnTweet => "own_tweet",
        }
    }
}
