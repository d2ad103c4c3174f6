//! CMS page repository
//!
//! Pages are addressed by slug. Content is stored as markdown; the
//! route layer renders HTML on the way out. Unpublished pages are
//! drafts only editors see.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{ExecResult, QueryTimer};
use crate::models::{Paginated, Pagination, PageSlug};

use super::{now_rfc3339, DbError};

#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub slug: String,
    pub titulo: String,
    pub contenido: String,
    pub publicada: bool,
    pub actualizado_por: Option<i64>,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPage {
    pub slug: PageSlug,
    pub titulo: String,
    pub contenido: String,
    pub publicada: bool,
    pub autor_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePage {
    pub titulo: Option<String>,
    pub contenido: Option<String>,
    pub publicada: Option<bool>,
}

const PAGE_COLUMNS: &str =
    "id, slug, titulo, contenido, publicada, actualizado_por, activo, created_at, updated_at";

fn map_page(row: &SqliteRow) -> PageRecord {
    PageRecord {
        id: row.get("id"),
        slug: row.get("slug"),
        titulo: row.get("titulo"),
        contenido: row.get("contenido"),
        publicada: row.get::<i64, _>("publicada") != 0,
        actualizado_por: row.get("actualizado_por"),
        activo: row.get::<i64, _>("activo") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Page repository
pub struct PageRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PageRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List pages. `published_only` is the anonymous-visitor view.
    pub async fn list(
        &self,
        published_only: bool,
        page: Pagination,
    ) -> Result<Paginated<PageRecord>, DbError> {
        let _t = QueryTimer::new("paginas.list");
        let sql = format!(
            "SELECT {PAGE_COLUMNS}, COUNT(*) OVER() AS total FROM paginas
             WHERE activo = 1 AND (? OR publicada = 1)
             ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(!published_only))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        // Empty page: run the count separately so total survives.
        let total = match rows.first() {
            Some(row) => row.get("total"),
            None => {
                let (n,): (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM paginas WHERE activo = 1 AND (? OR publicada = 1)",
                )
                .bind(i64::from(!published_only))
                .fetch_one(self.pool)
                .await?;
                n
            }
        };
        Ok(Paginated {
            items: rows.iter().map(map_page).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<PageRecord, DbError> {
        let _t = QueryTimer::new("paginas.get_by_slug");
        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM paginas WHERE slug = ? AND activo = 1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "pagina",
            id: slug.to_owned(),
        })?;

        Ok(map_page(&row))
    }

    /// Create a page: slug uniqueness pre-check and INSERT in one
    /// transaction.
    pub async fn create(&self, new: NewPage) -> Result<PageRecord, DbError> {
        let _t = QueryTimer::new("paginas.create");
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM paginas WHERE slug = ?")
            .bind(new.slug.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(DbError::Conflict {
                resource: "pagina",
                field: "slug",
                value: new.slug.into_string(),
            });
        }

        let now = now_rfc3339();
        let result: ExecResult = sqlx::query(
            r#"
            INSERT INTO paginas (slug, titulo, contenido, publicada, actualizado_por, activo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(new.slug.as_str())
        .bind(&new.titulo)
        .bind(&new.contenido)
        .bind(i64::from(new.publicada))
        .bind(new.autor_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .into();

        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM paginas WHERE id = ?"))
            .bind(result.last_insert_id)
            .fetch_one(&mut *tx)
            .await?;
        let record = map_page(&row);

        tx.commit().await?;
        Ok(record)
    }

    /// Update a page's editable fields. The slug is stable once created
    /// (external links point at it).
    pub async fn update(
        &self,
        slug: &str,
        changes: UpdatePage,
        editor_id: i64,
    ) -> Result<PageRecord, DbError> {
        let _t = QueryTimer::new("paginas.update");
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM paginas WHERE slug = ? AND activo = 1"
        ))
        .bind(slug)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "pagina",
            id: slug.to_owned(),
        })?;
        let current = map_page(&row);

        let titulo = changes.titulo.unwrap_or(current.titulo);
        let contenido = changes.contenido.unwrap_or(current.contenido);
        let publicada = changes.publicada.unwrap_or(current.publicada);

        sqlx::query(
            r#"
            UPDATE paginas
            SET titulo = ?, contenido = ?, publicada = ?, actualizado_por = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&titulo)
        .bind(&contenido)
        .bind(i64::from(publicada))
        .bind(editor_id)
        .bind(now_rfc3339())
        .bind(current.id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM paginas WHERE id = ?"))
            .bind(current.id)
            .fetch_one(&mut *tx)
            .await?;
        let record = map_page(&row);

        tx.commit().await?;
        Ok(record)
    }

    /// Soft delete.
    pub async fn remove(&self, slug: &str) -> Result<(), DbError> {
        let _t = QueryTimer::new("paginas.remove");
        let result: ExecResult =
            sqlx::query("UPDATE paginas SET activo = 0, updated_at = ? WHERE slug = ? AND activo = 1")
                .bind(now_rfc3339())
                .bind(slug)
                .execute(self.pool)
                .await?
                .into();

        if result.rows_affected == 0 {
            return Err(DbError::NotFound {
                resource: "pagina",
                id: slug.to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::test_pool;
    use crate::db::repos::users::{NewUser, UserRepo};
    use crate::models::{Email, Role};

    async fn editor(pool: &SqlitePool) -> i64 {
        UserRepo::new(pool)
            .create(NewUser {
                email: Email::new("editor@example.org").unwrap(),
                nombre: "Editor".into(),
                rol: Role::Comite,
                seccion_id: None,
                password_hash: "salt$digest".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn inicio(autor_id: i64) -> NewPage {
        NewPage {
            slug: PageSlug::new("inicio").unwrap(),
            titulo: "Bienvenida".into(),
            contenido: "# Hola\n\nBienvenidos al grupo.".into(),
            publicada: true,
            autor_id,
        }
    }

    #[tokio::test]
    async fn create_then_fetch_by_slug() {
        let (_dir, pool) = test_pool().await;
        let autor = editor(&pool).await;
        let repo = PageRepo::new(&pool);

        repo.create(inicio(autor)).await.unwrap();
        let page = repo.get_by_slug("inicio").await.unwrap();
        assert_eq!(page.titulo, "Bienvenida");
        assert!(page.publicada);
        assert_eq!(page.actualizado_por, Some(autor));
    }

    #[tokio::test]
    async fn duplicate_slug_conflicts() {
        let (_dir, pool) = test_pool().await;
        let autor = editor(&pool).await;
        let repo = PageRepo::new(&pool);

        repo.create(inicio(autor)).await.unwrap();
        let err = repo.create(inicio(autor)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { field: "slug", .. }));
    }

    #[tokio::test]
    async fn drafts_hidden_from_published_listing() {
        let (_dir, pool) = test_pool().await;
        let autor = editor(&pool).await;
        let repo = PageRepo::new(&pool);

        repo.create(inicio(autor)).await.unwrap();
        repo.create(NewPage {
            slug: PageSlug::new("borrador").unwrap(),
            titulo: "Borrador".into(),
            contenido: String::new(),
            publicada: false,
            autor_id: autor,
        })
        .await
        .unwrap();

        let public = repo.list(true, Pagination::default()).await.unwrap();
        assert_eq!(public.total, 1);

        let editors = repo.list(false, Pagination::default()).await.unwrap();
        assert_eq!(editors.total, 2);
    }

    #[tokio::test]
    async fn update_tracks_editor_and_publish_flag() {
        let (_dir, pool) = test_pool().await;
        let autor = editor(&pool).await;
        let repo = PageRepo::new(&pool);

        repo.create(NewPage {
            publicada: false,
            ..inicio(autor)
        })
        .await
        .unwrap();

        let updated = repo
            .update(
                "inicio",
                UpdatePage {
                    publicada: Some(true),
                    contenido: Some("## Actualizado".into()),
                    ..Default::default()
                },
                autor,
            )
            .await
            .unwrap();
        assert!(updated.publicada);
        assert_eq!(updated.contenido, "## Actualizado");
    }

    #[tokio::test]
    async fn soft_deleted_page_is_gone_by_slug() {
        let (_dir, pool) = test_pool().await;
        let autor = editor(&pool).await;
        let repo = PageRepo::new(&pool);

        repo.create(inicio(autor)).await.unwrap();
        repo.remove("inicio").await.unwrap();

        assert!(matches!(
            repo.get_by_slug("inicio").await.unwrap_err(),
            DbError::NotFound { .. }
        ));

        // Row still present under the flag.
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM paginas")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
