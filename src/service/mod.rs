//! Service layer
//!
//! Contains the domain rules separated from HTTP handlers.
//! Services own the per-request transaction and orchestrate
//! database and media storage operations.

mod media;
mod tweet;
mod user;

pub use media::MediaService;
pub use tweet::{DELETE_FORBIDDEN, LIKE_NOT_FOUND, TweetService};
pub use user::{ALREADY_FOLLOWING, FOLLOW_SELF, NOT_FOLLOWING, UserService};
