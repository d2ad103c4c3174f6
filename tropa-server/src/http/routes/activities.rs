//! Activity (calendar) endpoints
//!
//! Reads are public; mutations require an editing role (admin, comite
//! or scouter). The list endpoint drives the calendar with the
//! `desde`/`hasta` range filter.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::repos::{
    ActivityFilters, ActivityRecord, ActivityRepo, NewActivity, UpdateActivity,
};
use crate::http::error::ApiError;
use crate::http::extractors::AuthSession;
use crate::http::server::AppState;
use crate::models::{ActivityStatus, Paginated, Pagination, PaginationParams};

#[derive(Serialize)]
pub struct ActivityResponse {
    pub id: i64,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub lugar: Option<String>,
    pub fecha_inicio: String,
    pub fecha_fin: Option<String>,
    pub seccion_id: Option<i64>,
    pub estado: ActivityStatus,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ActivityRecord> for ActivityResponse {
    fn from(a: ActivityRecord) -> Self {
        Self {
            id: a.id,
            titulo: a.titulo,
            descripcion: a.descripcion,
            lugar: a.lugar,
            fecha_inicio: a.fecha_inicio,
            fecha_fin: a.fecha_fin,
            seccion_id: a.seccion_id,
            estado: a.estado,
            activo: a.activo,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub desde: Option<String>,
    pub hasta: Option<String>,
    pub seccion: Option<i64>,
    pub estado: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct CreateActivityRequest {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub lugar: Option<String>,
    pub fecha_inicio: String,
    pub fecha_fin: Option<String>,
    pub seccion_id: Option<i64>,
    pub estado: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdateActivityRequest {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub lugar: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub seccion_id: Option<i64>,
    pub estado: Option<String>,
}

fn require_editor(session: &AuthSession) -> Result<(), ApiError> {
    if session.user.rol.can_edit_content() {
        Ok(())
    } else {
        Err(ApiError::Forbidden {
            reason: "requires an editing role",
        })
    }
}

/// GET /actividades - public calendar feed
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<ActivityResponse>>, ApiError> {
    let filters = ActivityFilters {
        desde: params.desde,
        hasta: params.hasta,
        seccion_id: params.seccion,
        estado: params
            .estado
            .as_deref()
            .map(ActivityStatus::parse)
            .transpose()?,
    };
    let page = Pagination::from(params.page);

    let result = ActivityRepo::new(&state.pool).list(&filters, page).await?;
    Ok(Json(result.map(ActivityResponse::from)))
}

/// GET /actividades/{id} - public
async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let activity = ActivityRepo::new(&state.pool).get(id).await?;
    Ok(Json(activity.into()))
}

/// POST /actividades
async fn create_activity(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(req): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<ActivityResponse>), ApiError> {
    require_editor(&session)?;

    let estado = match req.estado.as_deref() {
        Some(raw) => ActivityStatus::parse(raw)?,
        None => ActivityStatus::Planificada,
    };

    let new = NewActivity {
        titulo: req.titulo,
        descripcion: req.descripcion,
        lugar: req.lugar,
        fecha_inicio: req.fecha_inicio,
        fecha_fin: req.fecha_fin,
        seccion_id: req.seccion_id,
        estado,
    };
    new.validate()?;

    let activity = ActivityRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(activity.into())))
}

/// PUT /actividades/{id}
async fn update_activity(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
    Json(req): Json<UpdateActivityRequest>,
) -> Result<Json<ActivityResponse>, ApiError> {
    require_editor(&session)?;

    let changes = UpdateActivity {
        titulo: req.titulo,
        descripcion: req.descripcion.map(Some),
        lugar: req.lugar.map(Some),
        fecha_inicio: req.fecha_inicio,
        fecha_fin: req.fecha_fin.map(Some),
        seccion_id: req.seccion_id.map(Some),
        estado: req.estado.as_deref().map(ActivityStatus::parse).transpose()?,
    };

    let activity = ActivityRepo::new(&state.pool).update(id, changes).await?;
    Ok(Json(activity.into()))
}

/// DELETE /actividades/{id} - soft delete
async fn remove_activity(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_editor(&session)?;
    ActivityRepo::new(&state.pool).remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activity routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actividades", get(list_activities).post(create_activity))
        .route(
            "/actividades/{id}",
            get(get_activity)
                .put(update_activity)
                .delete(remove_activity),
        )
}
