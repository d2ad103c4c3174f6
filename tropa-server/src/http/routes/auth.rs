//! Login, logout, and current-user endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{verify_password, SessionRepo};
use crate::db::repos::UserRepo;
use crate::http::error::ApiError;
use crate::http::extractors::AuthSession;
use crate::http::server::AppState;
use crate::models::Email;

use super::users::UserResponse;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub usuario: UserResponse,
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = Email::new(&req.email).map_err(|_| ApiError::Unauthorized)?;

    let sessions = SessionRepo::new(&state.pool);
    // Opportunistic sweep; login is infrequent enough to carry it.
    if let Err(e) = sessions.cleanup_expired().await {
        tracing::warn!("session cleanup failed: {e}");
    }

    let (user, stored_hash) = UserRepo::new(&state.pool)
        .get_auth_by_email(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&req.password, &stored_hash) {
        return Err(ApiError::Unauthorized);
    }

    let session = sessions
        .create(user.id, state.config.session_ttl_hours)
        .await?;

    tracing::info!(usuario = user.id, "login");
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        usuario: user.into(),
    }))
}

/// POST /auth/logout
async fn logout(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<StatusCode, ApiError> {
    SessionRepo::new(&state.pool).delete(&session.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
async fn me(session: AuthSession) -> Json<UserResponse> {
    Json(session.user.into())
}

/// Auth routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}
