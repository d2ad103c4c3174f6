//! Section endpoints
//!
//! Reads are public so the landing page can list the units without a
//! session; mutations are restricted to admin/comite.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::repos::{NewSection, SectionRecord, SectionRepo, UpdateSection};
use crate::http::error::ApiError;
use crate::http::extractors::AuthSession;
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Serialize)]
pub struct SectionResponse {
    pub id: i64,
    pub nombre: String,
    pub slug: String,
    pub edad_minima: i64,
    pub edad_maxima: i64,
    pub descripcion: Option<String>,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SectionRecord> for SectionResponse {
    fn from(s: SectionRecord) -> Self {
        Self {
            id: s.id,
            nombre: s.nombre,
            slug: s.slug,
            edad_minima: s.edad_minima,
            edad_maxima: s.edad_maxima,
            descripcion: s.descripcion,
            activo: s.activo,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub incluir_inactivas: bool,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct CreateSectionRequest {
    pub nombre: String,
    pub edad_minima: i64,
    pub edad_maxima: i64,
    pub descripcion: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateSectionRequest {
    pub nombre: Option<String>,
    pub edad_minima: Option<i64>,
    pub edad_maxima: Option<i64>,
    pub descripcion: Option<String>,
    pub activo: Option<bool>,
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

/// GET /secciones - public
async fn list_sections(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<SectionResponse>>, ApiError> {
    let page = Pagination::from(params.page);
    let result = SectionRepo::new(&state.pool)
        .list(params.incluir_inactivas, page)
        .await?;
    Ok(Json(result.map(SectionResponse::from)))
}

/// GET /secciones/{id} - public
async fn get_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SectionResponse>, ApiError> {
    let section = SectionRepo::new(&state.pool).get(id).await?;
    Ok(Json(section.into()))
}

/// POST /secciones
async fn create_section(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(req): Json<CreateSectionRequest>,
) -> Result<(StatusCode, Json<SectionResponse>), ApiError> {
    require_manager(&session)?;

    let new = NewSection {
        nombre: req.nombre,
        edad_minima: req.edad_minima,
        edad_maxima: req.edad_maxima,
        descripcion: req.descripcion,
    };
    new.validate()?;

    let section = SectionRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(section.into())))
}

/// PUT /secciones/{id}
async fn update_section(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSectionRequest>,
) -> Result<Json<SectionResponse>, ApiError> {
    require_manager(&session)?;

    let changes = UpdateSection {
        nombre: req.nombre,
        edad_minima: req.edad_minima,
        edad_maxima: req.edad_maxima,
        descripcion: req.descripcion.map(Some),
        activo: req.activo,
    };

    let section = SectionRepo::new(&state.pool).update(id, changes).await?;
    Ok(Json(section.into()))
}

/// DELETE /secciones/{id} - soft delete
async fn remove_section(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_manager(&session)?;
    SectionRepo::new(&state.pool).remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Section routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/secciones", get(list_sections).post(create_section))
        .route(
            "/secciones/{id}",
            get(get_section).put(update_section).delete(remove_section),
        )
}
