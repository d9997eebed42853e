//! User and follow endpoints

use axum::{extract::State, http::StatusCode, response::Json};

use crate::AppState;
use crate::api::converters::profile_to_response;
use crate::api::dto::{ResultResponse, UserResponse};
use crate::api::extract::ApiPath;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;
use crate::service::UserService;

/// GET /users/me
pub async fn me(CurrentUser(caller): CurrentUser) -> Json<UserResponse> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/me"])
        .start_timer();

    Json(profile_to_response(&caller))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/users/:id"])
        .start_timer();

    let profile = UserService::new(state.db.clone()).profile(user_id).await?;

    Ok(Json(profile_to_response(&profile)))
}

/// POST /users/:id/follow
pub async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<(StatusCode, Json<ResultResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/users/:id/follow"])
        .start_timer();

    UserService::new(state.db.clone())
        .follow(&caller, user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ResultResponse::ok())))
}

/// DELETE /users/:id/follow
pub async fn unfollow_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<ResultResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/users/:id/follow"])
        .start_timer();

    UserService::new(state.db.clone())
        .unfollow(&caller, user_id)
        .await?;

    Ok(Json(ResultResponse::ok()))
}
