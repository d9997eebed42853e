//! Conversion functions from database models to API DTOs

use crate::api::dto::*;
use crate::data::{TweetDetails, UserProfile, UserRef};

/// Convert UserRef to `{id, name}`
pub fn user_ref_to_view(user: &UserRef) -> UserRefView {
    UserRefView {
        id: user.id,
        name: user.username.clone(),
    }
}

/// Convert a fully loaded tweet to its nested view
pub fn tweet_to_view(details: &TweetDetails) -> TweetView {
    TweetView {
        id: details.tweet.id,
        content: details.tweet.content.clone(),
        attachments: details
            .media
            .iter()
            .map(|media| media.media_path.clone())
            .collect(),
        author: user_ref_to_view(&details.author),
        likes: details
            .likes
            .iter()
            .map(|like| LikeView {
                user_id: like.user_id,
                name: like.username.clone(),
            })
            .collect(),
    }
}

pub fn tweets_to_response(tweets: &[TweetDetails]) -> TweetListResponse {
    TweetListResponse {
        result: true,
        tweets: tweets.iter().map(tweet_to_view).collect(),
    }
}

/// Convert UserProfile to UserView
pub fn profile_to_view(profile: &UserProfile) -> UserView {
    UserView {
        id: profile.user.id,
        name: profile.user.username.clone(),
        followers: profile.followers.iter().map(user_ref_to_view).collect(),
        followings: profile.following.iter().map(user_ref_to_view).collect(),
    }
}

pub fn profile_to_response(profile: &UserProfile) -> UserResponse {
    UserResponse {
        result: true,
        user: profile_to_view(profile),
    }
}
