//! Document repository (upload metadata)
//!
//! Stores one row per uploaded file; the bytes live under the uploads
//! directory keyed by `nombre_archivo`. Documents are the one entity
//! with a hard delete: the route removes the row here, then unlinks the
//! file with the returned name.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{ExecResult, QueryTimer};
use crate::models::{Paginated, Pagination};

use super::{now_rfc3339, DbError};

#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: i64,
    pub nombre: String,
    pub nombre_archivo: String,
    pub mime: String,
    pub tamano: i64,
    pub subido_por: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub nombre: String,
    pub nombre_archivo: String,
    pub mime: String,
    pub tamano: i64,
    pub subido_por: i64,
}

const DOCUMENT_COLUMNS: &str = "id, nombre, nombre_archivo, mime, tamano, subido_por, created_at";

fn map_document(row: &SqliteRow) -> DocumentRecord {
    DocumentRecord {
        id: row.get("id"),
        nombre: row.get("nombre"),
        nombre_archivo: row.get("nombre_archivo"),
        mime: row.get("mime"),
        tamano: row.get("tamano"),
        subido_por: row.get("subido_por"),
        created_at: row.get("created_at"),
    }
}

/// Document repository
pub struct DocumentRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: Pagination) -> Result<Paginated<DocumentRecord>, DbError> {
        let _t = QueryTimer::new("documentos.list");
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS}, COUNT(*) OVER() AS total FROM documentos
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        // Empty page: run the count separately so total survives.
        let total = match rows.first() {
            Some(row) => row.get("total"),
            None => {
                let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documentos")
                    .fetch_one(self.pool)
                    .await?;
                n
            }
        };
        Ok(Paginated {
            items: rows.iter().map(map_document).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: i64) -> Result<DocumentRecord, DbError> {
        let _t = QueryTimer::new("documentos.get");
        let row = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documentos WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "documento",
            id: id.to_string(),
        })?;

        Ok(map_document(&row))
    }

    pub async fn create(&self, new: NewDocument) -> Result<DocumentRecord, DbError> {
        let _t = QueryTimer::new("documentos.create");
        let result: ExecResult = sqlx::query(
            r#"
            INSERT INTO documentos (nombre, nombre_archivo, mime, tamano, subido_por, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.nombre)
        .bind(&new.nombre_archivo)
        .bind(&new.mime)
        .bind(new.tamano)
        .bind(new.subido_por)
        .bind(now_rfc3339())
        .execute(self.pool)
        .await?
        .into();

        self.get(result.last_insert_id).await
    }

    /// Hard delete. Returns the stored filename so the caller can unlink
    /// the bytes after the row is gone.
    pub async fn remove(&self, id: i64) -> Result<String, DbError> {
        let _t = QueryTimer::new("documentos.remove");
        let record = self.get(id).await?;

        sqlx::query("DELETE FROM documentos WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(record.nombre_archivo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::test_pool;
    use crate::db::repos::users::{NewUser, UserRepo};
    use crate::models::{Email, Role};

    async fn uploader(pool: &SqlitePool) -> i64 {
        UserRepo::new(pool)
            .create(NewUser {
                email: Email::new("subidor@example.org").unwrap(),
                nombre: "Subidor".into(),
                rol: Role::Scouter,
                seccion_id: None,
                password_hash: "salt$digest".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn circular(subido_por: i64) -> NewDocument {
        NewDocument {
            nombre: "Circular campamento".into(),
            nombre_archivo: "ab12cd-circular.pdf".into(),
            mime: "application/pdf".into(),
            tamano: 52_000,
            subido_por,
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let (_dir, pool) = test_pool().await;
        let user = uploader(&pool).await;
        let repo = DocumentRepo::new(&pool);

        let doc = repo.create(circular(user)).await.unwrap();
        assert_eq!(doc.mime, "application/pdf");

        let listed = repo.list(Pagination::default()).await.unwrap();
        assert_eq!(listed.total, 1);
    }

    #[tokio::test]
    async fn remove_is_hard_and_returns_filename() {
        let (_dir, pool) = test_pool().await;
        let user = uploader(&pool).await;
        let repo = DocumentRepo::new(&pool);

        let doc = repo.create(circular(user)).await.unwrap();
        let filename = repo.remove(doc.id).await.unwrap();
        assert_eq!(filename, "ab12cd-circular.pdf");

        assert!(matches!(
            repo.get(doc.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM documentos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn fk_restrict_blocks_orphan_uploads() {
        let (_dir, pool) = test_pool().await;
        let repo = DocumentRepo::new(&pool);

        let err = repo.create(circular(999)).await.unwrap_err();
        assert!(matches!(err, DbError::Sqlx(_)));
    }
}
