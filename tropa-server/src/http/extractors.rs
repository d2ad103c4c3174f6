//! Custom Axum extractors for bearer-token auth

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::SessionRepo;
use crate::db::repos::users::UserRecord;

use super::error::ApiError;
use super::server::AppState;

/// Pull the bearer token out of the Authorization header, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authenticated request: resolves the bearer token to its user.
/// Missing, unknown, or expired tokens reject with 401.
pub struct AuthSession {
    pub user: UserRecord,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or(ApiError::Unauthorized)?
            .to_owned();

        let user = SessionRepo::new(&state.pool)
            .resolve(&token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self { user, token })
    }
}

/// Optional auth: anonymous requests extract as `None`, a presented but
/// invalid token still rejects with 401 (a client holding a stale token
/// should learn about it, not silently see the anonymous view).
pub struct MaybeAuth(pub Option<UserRecord>);

impl FromRequestParts<Arc<AppState>> for MaybeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        let user = SessionRepo::new(&state.pool)
            .resolve(token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self(Some(user)))
    }
}
