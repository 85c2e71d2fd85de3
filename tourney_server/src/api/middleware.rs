//! Caller identity.
//!
//! Authentication happens upstream; the proxy forwards the authenticated user
//! id in the `x-user-id` header. The middleware parses it once into request
//! extensions, and handlers pick it up through the [`Caller`] or [`Viewer`]
//! extractors.
//!
//! ```rust,no_run
//! use tourney_server::api::middleware::Caller;
//!
//! async fn protected_handler(Caller(user_id): Caller) -> String {
//!     format!("Authenticated as user {}", user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tourney_core::tournament::UserId;

use super::ApiError;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller; rejects the request with 401 when absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

/// Optional caller, for public views that personalize when a user is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Option<UserId>);

fn parse_user_id(value: &str) -> Option<UserId> {
    value.trim().parse().ok().filter(|id: &UserId| *id > 0)
}

/// Parse `x-user-id` into a [`Caller`] extension
///
/// A present but malformed header is rejected outright rather than treated as
/// anonymous.
pub async fn caller_middleware(mut request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(USER_ID_HEADER)
        .map(|value| value.to_str().ok().and_then(parse_user_id));

    match header {
        Some(Some(user_id)) => {
            request.extensions_mut().insert(Caller(user_id));
        }
        Some(None) => return ApiError::Unauthenticated.into_response(),
        None => {}
    }

    next.run(request).await
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or(ApiError::Unauthenticated)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Caller>().map(|caller| caller.0)))
    }
}
