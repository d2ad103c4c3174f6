//! Document upload endpoints
//!
//! Files land under the configured upload directory with a random hex
//! prefix so client-supplied names can never collide or escape the
//! directory. Deleting removes the database row first, then unlinks.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use rand::RngCore;
use serde::Serialize;

use crate::db::repos::{DocumentRecord, DocumentRepo, NewDocument};
use crate::http::error::ApiError;
use crate::http::extractors::AuthSession;
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams, ValidationError};

/// Uploads larger than this are rejected before touching disk.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: i64,
    pub nombre: String,
    pub nombre_archivo: String,
    pub mime: String,
    pub tamano: i64,
    pub subido_por: i64,
    pub created_at: String,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(d: DocumentRecord) -> Self {
        Self {
            id: d.id,
            nombre: d.nombre,
            nombre_archivo: d.nombre_archivo,
            mime: d.mime,
            tamano: d.tamano,
            subido_por: d.subido_por,
            created_at: d.created_at,
        }
    }
}

/// Strip anything that could traverse directories, keep the extension.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "archivo".to_owned()
    } else {
        cleaned
    }
}

/// Random hex prefix keeping stored names unique.
fn storage_name(original: &str) -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}-{}", hex::encode(bytes), sanitize_filename(original))
}

/// GET /uploads
async fn list_documents(
    State(state): State<Arc<AppState>>,
    _session: AuthSession,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<DocumentResponse>>, ApiError> {
    let page = Pagination::from(params);
    let result = DocumentRepo::new(&state.pool).list(page).await?;
    Ok(Json(result.map(DocumentResponse::from)))
}

/// POST /uploads - multipart with a `file` part and optional `nombre`
async fn upload_document(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    if !session.user.rol.can_edit_content() {
        return Err(ApiError::Forbidden {
            reason: "requires an editing role",
        });
    }

    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut nombre: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("malformed multipart body: {e}");
        ApiError::Validation(ValidationError::InvalidFormat {
            field: "multipart",
            reason: "malformed multipart body",
        })
    })? {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| "archivo".to_owned());
                let mime = field
                    .content_type()
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| "application/octet-stream".to_owned());
                let data = field.bytes().await.map_err(|e| {
                    tracing::debug!("could not read file body: {e}");
                    ApiError::Validation(ValidationError::InvalidFormat {
                        field: "file",
                        reason: "could not read file body",
                    })
                })?;
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(ValidationError::OutOfRange {
                        field: "file",
                        reason: "file exceeds the 20 MiB limit",
                    }
                    .into());
                }
                file = Some((filename, mime, data.to_vec()));
            }
            Some("nombre") => {
                nombre = field.text().await.ok();
            }
            _ => {}
        }
    }

    let (filename, mime, data) = file.ok_or(ApiError::Validation(ValidationError::Empty {
        field: "file",
    }))?;
    if data.is_empty() {
        return Err(ValidationError::Empty { field: "file" }.into());
    }

    let stored = storage_name(&filename);
    let path = state.config.upload_dir.join(&stored);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::Internal {
            message: format!("writing upload {stored}: {e}"),
        })?;

    let new = NewDocument {
        nombre: nombre.filter(|n| !n.trim().is_empty()).unwrap_or(filename),
        nombre_archivo: stored.clone(),
        mime,
        tamano: data.len() as i64,
        subido_por: session.user.id,
    };

    let document = match DocumentRepo::new(&state.pool).create(new).await {
        Ok(d) => d,
        Err(e) => {
            // Insert failed; do not leave orphan bytes behind.
            if let Err(unlink) = tokio::fs::remove_file(&path).await {
                tracing::warn!("could not remove orphan upload {stored}: {unlink}");
            }
            return Err(e.into());
        }
    };

    tracing::info!(documento = document.id, archivo = %stored, "upload stored");
    Ok((StatusCode::CREATED, Json(document.into())))
}

/// GET /uploads/{id} - file bytes with the stored content type
async fn download_document(
    State(state): State<Arc<AppState>>,
    _session: AuthSession,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let document = DocumentRepo::new(&state.pool).get(id).await?;
    let path = state.config.upload_dir.join(&document.nombre_archivo);

    let data = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(
            "upload file missing for documento {}: {e}",
            document.id
        );
        ApiError::NotFound {
            resource: "documento",
            id: id.to_string(),
        }
    })?;

    Response::builder()
        .header(header::CONTENT_TYPE, &document.mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.nombre_archivo),
        )
        .body(Body::from(data))
        .map_err(|e| ApiError::Internal {
            message: format!("building download response: {e}"),
        })
}

/// DELETE /uploads/{id} - manager or original uploader
async fn remove_document(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = DocumentRepo::new(&state.pool);
    let document = repo.get(id).await?;

    if !session.user.rol.can_manage_users() && document.subido_por != session.user.id {
        return Err(ApiError::Forbidden {
            reason: "only the uploader or a manager can delete a document",
        });
    }

    // Row first; the file is unrecoverable anyway once the row is gone.
    let filename = repo.remove(id).await?;
    let path = state.config.upload_dir.join(&filename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("document {id} removed but file {filename} was not: {e}");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Upload routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads", get(list_documents).post(upload_document))
        .route(
            "/uploads/{id}",
            get(download_document).delete(remove_document),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("informe final.pdf"), "informe_final.pdf");
        assert_eq!(sanitize_filename("..."), "archivo");
    }

    #[test]
    fn storage_name_is_prefixed() {
        let name = storage_name("circular.pdf");
        assert!(name.ends_with("-circular.pdf"));
        // 6 random bytes hex-encoded
        assert_eq!(name.split('-').next().unwrap().len(), 12);
    }
}
