//! Message repository
//!
//! Simple user-to-user inbox: send, list own inbox (JOINed with sender
//! name, no N+1), mark read. Messages follow their users on delete via
//! the schema's CASCADE rule.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{ExecResult, QueryTimer};
use crate::models::{Paginated, Pagination, ValidationError};

use super::{now_rfc3339, DbError};

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: i64,
    pub remitente_id: i64,
    pub remitente_nombre: String,
    pub destinatario_id: i64,
    pub asunto: Option<String>,
    pub cuerpo: String,
    pub leido: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub remitente_id: i64,
    pub destinatario_id: i64,
    pub asunto: Option<String>,
    pub cuerpo: String,
}

impl NewMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cuerpo.trim().is_empty() {
            return Err(ValidationError::Empty { field: "cuerpo" });
        }
        Ok(())
    }
}

fn map_message(row: &SqliteRow) -> MessageRecord {
    MessageRecord {
        id: row.get("id"),
        remitente_id: row.get("remitente_id"),
        remitente_nombre: row.get("remitente_nombre"),
        destinatario_id: row.get("destinatario_id"),
        asunto: row.get("asunto"),
        cuerpo: row.get("cuerpo"),
        leido: row.get::<i64, _>("leido") != 0,
        created_at: row.get("created_at"),
    }
}

/// Message repository
pub struct MessageRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Inbox for one user, newest first, sender name included.
    pub async fn inbox(
        &self,
        user_id: i64,
        unread_only: bool,
        page: Pagination,
    ) -> Result<Paginated<MessageRecord>, DbError> {
        let _t = QueryTimer::new("mensajes.inbox");
        let rows = sqlx::query(
            r#"
            SELECT
                m.id, m.remitente_id, u.nombre AS remitente_nombre,
                m.destinatario_id, m.asunto, m.cuerpo, m.leido, m.created_at,
                COUNT(*) OVER() AS total
            FROM mensajes m
            JOIN usuarios u ON u.id = m.remitente_id
            WHERE m.destinatario_id = ? AND (? OR m.leido = 0)
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(i64::from(!unread_only))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        // Empty page: run the count separately so total survives.
        let total = match rows.first() {
            Some(row) => row.get("total"),
            None => {
                let (n,): (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM mensajes WHERE destinatario_id = ? AND (? OR leido = 0)",
                )
                .bind(user_id)
                .bind(i64::from(!unread_only))
                .fetch_one(self.pool)
                .await?;
                n
            }
        };
        Ok(Paginated {
            items: rows.iter().map(map_message).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Unread count for the dashboard badge.
    pub async fn unread_count(&self, user_id: i64) -> Result<i64, DbError> {
        let _t = QueryTimer::new("mensajes.unread_count");
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM mensajes WHERE destinatario_id = ? AND leido = 0")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Send: verifies the recipient exists and is active, then inserts,
    /// in one transaction.
    pub async fn send(&self, new: NewMessage) -> Result<MessageRecord, DbError> {
        let _t = QueryTimer::new("mensajes.send");
        let mut tx = self.pool.begin().await?;

        let recipient = sqlx::query("SELECT id FROM usuarios WHERE id = ? AND activo = 1")
            .bind(new.destinatario_id)
            .fetch_optional(&mut *tx)
            .await?;
        if recipient.is_none() {
            return Err(DbError::NotFound {
                resource: "usuario",
                id: new.destinatario_id.to_string(),
            });
        }

        let result: ExecResult = sqlx::query(
            r#"
            INSERT INTO mensajes (remitente_id, destinatario_id, asunto, cuerpo, leido, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(new.remitente_id)
        .bind(new.destinatario_id)
        .bind(&new.asunto)
        .bind(&new.cuerpo)
        .bind(now_rfc3339())
        .execute(&mut *tx)
        .await?
        .into();

        let row = sqlx::query(
            r#"
            SELECT m.id, m.remitente_id, u.nombre AS remitente_nombre,
                   m.destinatario_id, m.asunto, m.cuerpo, m.leido, m.created_at
            FROM mensajes m
            JOIN usuarios u ON u.id = m.remitente_id
            WHERE m.id = ?
            "#,
        )
        .bind(result.last_insert_id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_message(&row);

        tx.commit().await?;
        Ok(record)
    }

    /// Mark one of the recipient's messages as read.
    pub async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<(), DbError> {
        let _t = QueryTimer::new("mensajes.mark_read");
        let result: ExecResult =
            sqlx::query("UPDATE mensajes SET leido = 1 WHERE id = ? AND destinatario_id = ?")
                .bind(id)
                .bind(recipient_id)
                .execute(self.pool)
                .await?
                .into();

        if result.rows_affected == 0 {
            return Err(DbError::NotFound {
                resource: "mensaje",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
