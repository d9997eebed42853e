//! API key authentication
//!
//! Handles:
//! - Resolving the `api-key` header to a user
//! - Authentication middleware and extractor

mod middleware;

pub use middleware::{CurrentUser, authenticate_api_key, require_api_key};
