//! User endpoints
//!
//! Mutations are restricted to admin/comite; reads require a session.
//! A user may always read themselves and change their own password.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::hash_password;
use crate::db::repos::{NewUser, UpdateUser, UserFilters, UserRecord, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::AuthSession;
use crate::http::server::AppState;
use crate::models::{Email, Paginated, Pagination, PaginationParams, Role, ValidationError};

/// User as serialized in responses. Never carries the password hash.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub nombre: String,
    pub rol: Role,
    pub seccion_id: Option<i64>,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserRecord> for UserResponse {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            nombre: u.nombre,
            rol: u.rol,
            seccion_id: u.seccion_id,
            activo: u.activo,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub rol: Option<String>,
    pub seccion: Option<i64>,
    pub activo: Option<bool>,
    pub q: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub nombre: String,
    pub rol: String,
    pub seccion_id: Option<i64>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub nombre: Option<String>,
    pub rol: Option<String>,
    /// Explicit null clears the section; absent leaves it alone.
    #[serde(default, deserialize_with = "double_option")]
    pub seccion_id: Option<Option<i64>>,
    pub activo: Option<bool>,
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// Distinguishes a field set to null from a field left out entirely.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidFormat {
            field: "password",
            reason: "must be at least 8 characters",
        });
    }
    Ok(())
}

fn require_manager(session: &AuthSession) -> Result<(), ApiError> {
    if session.user.rol.can_manage_users() {
        Ok(())
    } else {
        Err(ApiError::Forbidden {
            reason: "requires admin or comite role",
        })
    }
}

/// GET /usuarios
async fn list_users(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<UserResponse>>, ApiError> {
    require_manager(&session)?;

    let filters = UserFilters {
        rol: params.rol.as_deref().map(Role::parse).transpose()?,
        seccion_id: params.seccion,
        activo: params.activo,
        q: params.q,
    };
    let page = Pagination::from(params.page);

    let result = UserRepo::new(&state.pool).list(&filters, page).await?;
    Ok(Json(result.map(UserResponse::from)))
}

/// POST /usuarios
async fn create_user(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_manager(&session)?;

    if req.nombre.trim().is_empty() {
        return Err(ValidationError::Empty { field: "nombre" }.into());
    }
    validate_password(&req.password)?;

    let new = NewUser {
        email: Email::new(&req.email)?,
        nombre: req.nombre,
        rol: Role::parse(&req.rol)?,
        seccion_id: req.seccion_id,
        password_hash: hash_password(&req.password),
    };

    let user = UserRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /usuarios/{id}
async fn get_user(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    if session.user.id != id {
        require_manager(&session)?;
    }
    let user = UserRepo::new(&state.pool).get(id).await?;
    Ok(Json(user.into()))
}

/// PUT /usuarios/{id}
async fn update_user(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    require_manager(&session)?;

    let changes = UpdateUser {
        email: req.email.as_deref().map(Email::new).transpose()?,
        nombre: req.nombre,
        rol: req.rol.as_deref().map(Role::parse).transpose()?,
        seccion_id: req.seccion_id,
        activo: req.activo,
    };

    let user = UserRepo::new(&state.pool).update(id, changes).await?;
    Ok(Json(user.into()))
}

/// DELETE /usuarios/{id} - soft delete
async fn remove_user(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_manager(&session)?;
    if session.user.id == id {
        return Err(ApiError::Forbidden {
            reason: "cannot deactivate your own account",
        });
    }
    UserRepo::new(&state.pool).remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /usuarios/{id}/password - self or manager
async fn set_password(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(req): Json<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if session.user.id != id {
        require_manager(&session)?;
    }
    validate_password(&req.password)?;

    UserRepo::new(&state.pool)
        .set_password(id, &hash_password(&req.password))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/usuarios", get(list_users).post(create_user))
        .route(
            "/usuarios/{id}",
            get(get_user).put(update_user).delete(remove_user),
        )
        .route("/usuarios/{id}/password", put(set_password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_length_rule() {
        assert!(validate_password("corta").is_err());
        assert!(validate_password("suficiente").is_ok());
    }
}
