//! Internal messaging endpoints
//!
//! Every endpoint is scoped to the authenticated user: you read your
//! own inbox, you send as yourself, you mark your own messages read.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::repos::{MessageRecord, MessageRepo, NewMessage};
use crate::http::error::ApiError;
use crate::http::extractors::AuthSession;
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

#[derive(Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub remitente_id: i64,
    pub remitente_nombre: String,
    pub destinatario_id: i64,
    pub asunto: Option<String>,
    pub cuerpo: String,
    pub leido: bool,
    pub created_at: String,
}

impl From<MessageRecord> for MessageResponse {
    fn from(m: MessageRecord) -> Self {
        Self {
            id: m.id,
            remitente_id: m.remitente_id,
            remitente_nombre: m.remitente_nombre,
            destinatario_id: m.destinatario_id,
            asunto: m.asunto,
            cuerpo: m.cuerpo,
            leido: m.leido,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct InboxParams {
    #[serde(default)]
    pub no_leidos: bool,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub destinatario_id: i64,
    pub asunto: Option<String>,
    pub cuerpo: String,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub no_leidos: i64,
}

/// GET /mensajes - own inbox
async fn inbox(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Query(params): Query<InboxParams>,
) -> Result<Json<Paginated<MessageResponse>>, ApiError> {
    let page = Pagination::from(params.page);
    let result = MessageRepo::new(&state.pool)
        .inbox(session.user.id, params.no_leidos, page)
        .await?;
    Ok(Json(result.map(MessageResponse::from)))
}

/// GET /mensajes/no-leidos - badge count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = MessageRepo::new(&state.pool)
        .unread_count(session.user.id)
        .await?;
    Ok(Json(UnreadCountResponse { no_leidos: count }))
}

/// POST /mensajes
async fn send_message(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let new = NewMessage {
        remitente_id: session.user.id,
        destinatario_id: req.destinatario_id,
        asunto: req.asunto,
        cuerpo: req.cuerpo,
    };
    new.validate()?;

    let message = MessageRepo::new(&state.pool).send(new).await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

/// PUT /mensajes/{id}/leido
async fn mark_read(
    State(state): State<Arc<AppState>>,
    session: AuthSession,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    MessageRepo::new(&state.pool)
        .mark_read(id, session.user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Message routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mensajes", get(inbox).post(send_message))
        .route("/mensajes/no-leidos", get(unread_count))
        .route("/mensajes/{id}/leido", put(mark_read))
}
