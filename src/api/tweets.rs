//! Tweet and like endpoints

use axum::{extract::State, http::StatusCode, response::Json};

use crate::AppState;
use crate::api::converters::tweets_to_response;
use crate::api::dto::{CreateTweetRequest, CreateTweetResponse, ResultResponse, TweetListResponse};
use crate::api::extract::{ApiJson, ApiPath};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::TweetService;

fn tweet_service(state: &AppState) -> TweetService {
    TweetService::new(state.db.clone(), state.storage.clone())
}

/// POST /tweets
pub async fn create_tweet(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiJson(req): ApiJson<CreateTweetRequest>,
) -> Result<(StatusCode, Json<CreateTweetResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/tweets"])
        .start_timer();

    req.validate()?;

    let tweet = tweet_service(&state)
        .create(&caller, &req.tweet_data, req.media_ids())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTweetResponse {
            result: true,
            tweet_id: tweet.id,
        }),
    ))
}

/// DELETE /tweets/:id
pub async fn delete_tweet(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(tweet_id): ApiPath<i64>,
) -> Result<Json<ResultResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/tweets/:id"])
        .start_timer();

    tweet_service(&state).delete(&caller, tweet_id).await?;

    Ok(Json(ResultResponse::ok()))
}

/// POST /tweets/:id/likes
pub async fn like_tweet(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(tweet_id): ApiPath<i64>,
) -> Result<(StatusCode, Json<ResultResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/tweets/:id/likes"])
        .start_timer();

    tweet_service(&state).like(&caller, tweet_id).await?;

    Ok((StatusCode::CREATED, Json(ResultResponse::ok())))
}

/// DELETE /tweets/:id/likes
pub async fn unlike_tweet(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(tweet_id): ApiPath<i64>,
) -> Result<Json<ResultResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/tweets/:id/likes"])
        .start_timer();

    tweet_service(&state).unlike(&caller, tweet_id).await?;

    Ok(Json(ResultResponse::ok()))
}

/// GET /tweets
pub async fn list_tweets(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
) -> Result<Json<TweetListResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/tweets"])
        .start_timer();

    let tweets = tweet_service(&state).list_all().await?;

    Ok(Json(tweets_to_response(&tweets)))
}

/// GET /tweets/:user_id
///
/// Tweets by the user and everyone it follows.
pub async fn user_timeline(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<TweetListResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/tweets/:user_id"])
        .start_timer();

    let tweets = tweet_service(&state).timeline(user_id).await?;

    Ok(Json(tweets_to_response(&tweets)))
}
