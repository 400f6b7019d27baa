//! Actor extraction
//!
//! Sessions are handled upstream; the session layer forwards the
//! authenticated user id in [`ACTOR_HEADER`]. Handlers that take an
//! [`Actor`] reject requests without a known user with 401.

use crate::api::rest::state::AppState;
use crate::error::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};
use console_types::{User, UserId};

/// Header carrying the authenticated user id
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated user behind a request
#[derive(Debug, Clone)]
pub struct Actor(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {} header", ACTOR_HEADER)))?;
        let id = raw
            .to_str()
            .map_err(|_| {
                ApiError::BadRequest(format!("{} header is not valid text", ACTOR_HEADER))
            })?
            .trim();
        if id.is_empty() {
            return Err(ApiError::Unauthenticated(format!("empty {} header", ACTOR_HEADER)));
        }

        let user = state
            .storage
            .get_user(&UserId::new(id))
            .await?
            .ok_or_else(|| ApiError::Unauthenticated(format!("unknown actor {}", id)))?;
        Ok(Actor(user))
    }
}
