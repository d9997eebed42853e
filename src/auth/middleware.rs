//! API key authentication
//!
//! Every protected route resolves the caller from the API key header.
//! Nothing is cached between requests; each request re-resolves.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::data::UserProfile;
use crate::error::AppError;

fn extract_api_key(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Resolve an API key to exactly one user, follow edges loaded.
///
/// # Errors
/// `Unauthorized` when the key is missing, empty or unknown
pub async fn authenticate_api_key(
    api_key: Option<&str>,
    state: &AppState,
) -> Result<UserProfile, AppError> {
    let Some(api_key) = api_key.filter(|key| !key.is_empty()) else {
        tracing::debug!("Rejected request without API key");
        return Err(AppError::Unauthorized);
    };

    match state.db.find_user_by_key(api_key).await? {
        Some(profile) => Ok(profile),
        None => {
            tracing::debug!("Rejected request with unknown API key");
            Err(AppError::Unauthorized)
        }
    }
}

/// Middleware to require a valid API key
///
/// Adds the resolved `UserProfile` to request extensions.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/tweets", ...)
///     .layer(middleware::from_fn_with_state(state, require_api_key));
/// ```
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = extract_api_key(request.headers(), &state.config.auth.header_name);
    let profile = authenticate_api_key(api_key.as_deref(), &state).await?;

    request.extensions_mut().insert(profile);

    Ok(next.run(request).await)
}

/// Extractor for the current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(caller): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", caller.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Reuse the profile resolved by `require_api_key`, or resolve it here.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(profile) = parts.extensions.get::<UserProfile>().cloned() {
            return Ok(CurrentUser(profile));
        }

        let state = AppState::from_ref(state);
        let api_key = extract_api_key(&parts.headers, &state.config.auth.header_name);
        let profile = authenticate_api_key(api_key.as_deref(), &state).await?;
        parts.extensions.insert(profile.clone());

        Ok(CurrentUser(profile))
    }
}
