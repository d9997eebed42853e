//! API layer
//!
//! HTTP handlers for:
//! - Tweets and likes
//! - Users and follows
//! - Media uploads and stored files
//! - Metrics (Prometheus)

mod converters;
mod dto;
mod extract;
mod media;
pub mod metrics;
mod tweets;
mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::AppState;
use crate::auth::require_api_key;

pub use converters::*;
pub use dto::*;
pub use extract::{ApiJson, ApiPath};

pub use metrics::metrics_router;

/// Multipart framing allowance on top of the largest accepted file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the API router
///
/// Every route except stored-file downloads requires an API key.
/// The API key check runs before any body or path extraction.
pub fn api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/medias", post(media::upload_media))
        .route(
            "/tweets",
            get(tweets::list_tweets).post(tweets::create_tweet),
        )
        .route(
            "/tweets/:id",
            get(tweets::user_timeline).delete(tweets::delete_tweet),
        )
        .route(
            "/tweets/:id/likes",
            post(tweets::like_tweet).delete(tweets::unlike_tweet),
        )
        .route("/users/me", get(users::me))
        .route("/users/:id", get(users::get_user))
        .route(
            "/users/:id/follow",
            post(users::follow_user).delete(users::unfollow_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public_routes =
        Router::new().nest_service("/medias/files", ServeDir::new(state.storage.root()));

    let body_limit = state.storage.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    // Over-limit bodies surface as multipart errors, rendered by the upload handler
    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
}
