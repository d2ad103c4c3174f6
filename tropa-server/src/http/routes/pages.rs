//! CMS page endpoints
//!
//! Pages store markdown; responses carry both the source and the
//! rendered HTML. Anonymous visitors only see published pages, editors
//! see drafts too.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use tropa_core::render_markdown;

use crate::db::repos::{NewPage, PageRecord, PageRepo, UpdatePage};
use crate::http::error::ApiError;
use crate::http::extractors::{AuthSession, MaybeAuth};
use crate::http::server::AppState;
use crate::models::{Paginated, PageSlug, Pagination, PaginationParams, ValidationError};

/// Listing entry: no content body, listings stay light.
#[derive(Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub slug: String,
    pub titulo: String,
    pub publicada: bool,
    pub updated_at: String,
}

impl From<PageRecord> for PageSummary {
    fn from(p: PageRecord) -> Self {
        Self {
            id: p.id,
            slug: p.slug,
            titulo: p.titulo,
            publicada: p.publicada,
            updated_at: p.updated_at,
        }
    }
}

/// Full page: markdown source plus rendered HTML.
#[derive(Serialize)]
pub struct PageResponse {
    pub id: i64,
    pub slug: String,
    pub titulo: String,
    pub contenido: String,
    pub html: String,
    pub publicada: bool,
    pub actualizado_por: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PageRecord> for PageResponse {
    fn from(p: PageRecord) -> Self {
        let html = render_markdown(&p.contenido);
        Self {
            id: p.id,
            slug: p.slug,
            titulo: p.titulo,
            contenido: p.contenido,
            html,
            publicada: p.publicada,
            actualizado_por: p.actualizado_por,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct CreatePageRequest {
    /// Optional; derived from the title when absent.
    pub slug: Option<String>,
    pub titulo: String,
    pub contenido: String,
    #[serde(default)]
    pub publicada: bool,
}

#[derive(Deserialize, Default)]
pub struct UpdatePageRequest {
    pub titulo: Option<String>,
    pub contenido: Option<String>,
    pub publicada: Option<bool>,
}

fn require_editor(user: &crate::db::repos::UserRecord) -> Result<(), ApiError> {
    if user.rol.can_edit_content() {
        Ok(())
    } else {
        Err(ApiError::Forbidden {
            reason: "requires an editing role",
        })
    }
}

/// GET /paginas - anonymous sees published only
async fn list_pages(
    State(state): State<Arc<AppState>>,
    MaybeAuth(user): MaybeAuth,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<PageSummary>>, ApiError> {
    let published_only = !user.map(|u| u.rol.can_edit_content()).unwrap_or(false);
    let page = Pagination::from(params.page);

    let result = PageRepo::new(&state.pool)
        .list(published_only, page)
        .await?;
    Ok(Json(result.map(PageSummary::from)))
}

/// GET /paginas/{slug}
async fn get_page(
    State(state): State<Arc<AppState>>,
    MaybeAuth(user): MaybeAuth,
    Path(slug): Path<String>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = PageRepo::new(&state.pool).get_by_slug(&slug).await?;

    // Drafts look like missing pages to anyone who cannot edit.
    let can_see_drafts = user.map(|u| u.rol.can_edit_content()).unwrap_or(false);
    if !page.publicada && !can_see_drafts {
        return Err(ApiError::NotFound {
            resource: "pagina",
            id: slug,
        });
    }

    Ok(Json(page.into()))
}

/// POST /paginas
async fn create_page(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(req): Json<CreatePageRequest>,
) -> Result<(StatusCode, Json<PageResponse>), ApiError> {
    require_editor(&session.user)?;

    if req.titulo.trim().is_empty() {
        return Err(ValidationError::Empty { field: "titulo" }.into());
    }

    let slug = match req.slug.as_deref() {
        Some(raw) => PageSlug::new(raw)?,
        None => PageSlug::from_title(&req.titulo)?,
    };

    let new = NewPage {
        slug,
        titulo: req.titulo,
        contenido: req.contenido,
        publicada: req.publicada,
        autor_id: session.user.id,
    };

    let page = PageRepo::new(&state.pool).create(new).await?;
    Ok((StatusCode::CREATED, Json(page.into())))
}

/// PUT /paginas/{slug}
async fn update_page(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(slug): Path<String>,
    Json(req): Json<UpdatePageRequest>,
) -> Result<Json<PageResponse>, ApiError> {
    require_editor(&session.user)?;

    let changes = UpdatePage {
        titulo: req.titulo,
        contenido: req.contenido,
        publicada: req.publicada,
    };

    let page = PageRepo::new(&state.pool)
        .update(&slug, changes, session.user.id)
        .await?;
    Ok(Json(page.into()))
}

/// DELETE /paginas/{slug} - soft delete
async fn remove_page(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_editor(&session.user)?;
    PageRepo::new(&state.pool).remove(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Page routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/paginas", get(list_pages).post(create_page))
        .route(
            "/paginas/{slug}",
            get(get_page).put(update_page).delete(remove_page),
        )
}
