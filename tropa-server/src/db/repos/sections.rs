//! Section repository
//!
//! Sections are the age-banded units (castores, lobatos, tropa...).
//! The age-range CHECK constraints live in the schema; the repository
//! only guards name/slug uniqueness.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{ExecResult, QueryTimer};
use crate::models::{Paginated, Pagination, ValidationError};

use super::{now_rfc3339, DbError};

#[derive(Debug, Clone)]
pub struct SectionRecord {
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

#[derive(Debug, Clone)]
pub struct NewSection {
    pub nombre: String,
    pub edad_minima: i64,
    pub edad_maxima: i64,
    pub descripcion: Option<String>,
}

impl NewSection {
    /// Range check mirroring the schema CHECK, surfaced as a 400 rather
    /// than a raw constraint error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nombre.trim().is_empty() {
            return Err(ValidationError::Empty { field: "nombre" });
        }
        if self.edad_minima < 5 || self.edad_maxima > 21 || self.edad_minima > self.edad_maxima {
            return Err(ValidationError::OutOfRange {
                field: "edad",
                reason: "range must fall within 5..=21 with minima <= maxima",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSection {
    pub nombre: Option<String>,
    pub edad_minima: Option<i64>,
    pub edad_maxima: Option<i64>,
    pub descripcion: Option<Option<String>>,
    pub activo: Option<bool>,
}

const SECTION_COLUMNS: &str =
    "id, nombre, slug, edad_minima, edad_maxima, descripcion, activo, created_at, updated_at";

fn map_section(row: &SqliteRow) -> SectionRecord {
    SectionRecord {
        id: row.get("id"),
        nombre: row.get("nombre"),
        slug: row.get("slug"),
        edad_minima: row.get("edad_minima"),
        edad_maxima: row.get("edad_maxima"),
        descripcion: row.get("descripcion"),
        activo: row.get::<i64, _>("activo") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Section repository
pub struct SectionRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SectionRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List sections ordered by minimum age (youngest unit first).
    pub async fn list(
        &self,
        include_inactive: bool,
        page: Pagination,
    ) -> Result<Paginated<SectionRecord>, DbError> {
        let _t = QueryTimer::new("secciones.list");
        let sql = format!(
            "SELECT {SECTION_COLUMNS}, COUNT(*) OVER() AS total FROM secciones
             WHERE (? OR activo = 1)
             ORDER BY edad_minima ASC, id ASC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(include_inactive))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        // Empty page: run the count separately so total survives.
        let total = match rows.first() {
            Some(row) => row.get("total"),
            None => {
                let (n,): (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM secciones WHERE (? OR activo = 1)")
                        .bind(i64::from(include_inactive))
                        .fetch_one(self.pool)
                        .await?;
                n
            }
        };
        Ok(Paginated {
            items: rows.iter().map(map_section).collect(),
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: i64) -> Result<SectionRecord, DbError> {
        let _t = QueryTimer::new("secciones.get");
        let row = sqlx::query(&format!(
            "SELECT {SECTION_COLUMNS} FROM secciones WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "seccion",
            id: id.to_string(),
        })?;

        Ok(map_section(&row))
    }

    /// Create a section; the slug is derived from the name.
    pub async fn create(&self, new: NewSection) -> Result<SectionRecord, DbError> {
        let _t = QueryTimer::new("secciones.create");
        let slug = tropa_core::slugify(&new.nombre);
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM secciones WHERE nombre = ? OR slug = ?")
            .bind(&new.nombre)
            .bind(&slug)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(DbError::Conflict {
                resource: "seccion",
                field: "nombre",
                value: new.nombre,
            });
        }

        let now = now_rfc3339();
        let result: ExecResult = sqlx::query(
            r#"
            INSERT INTO secciones (nombre, slug, edad_minima, edad_maxima, descripcion, activo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&new.nombre)
        .bind(&slug)
        .bind(new.edad_minima)
        .bind(new.edad_maxima)
        .bind(&new.descripcion)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .into();

        let row = sqlx::query(&format!(
            "SELECT {SECTION_COLUMNS} FROM secciones WHERE id = ?"
        ))
        .bind(result.last_insert_id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_section(&row);

        tx.commit().await?;
        Ok(record)
    }

    pub async fn update(&self, id: i64, changes: UpdateSection) -> Result<SectionRecord, DbError> {
        let _t = QueryTimer::new("secciones.update");
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {SECTION_COLUMNS} FROM secciones WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "seccion",
            id: id.to_string(),
        })?;
        let current = map_section(&row);

        if let Some(nombre) = &changes.nombre {
            let taken = sqlx::query("SELECT id FROM secciones WHERE nombre = ? AND id != ?")
                .bind(nombre)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if taken.is_some() {
                return Err(DbError::Conflict {
                    resource: "seccion",
                    field: "nombre",
                    value: nombre.clone(),
                });
            }
        }

        let nombre = changes.nombre.unwrap_or(current.nombre);
        let slug = tropa_core::slugify(&nombre);
        let edad_minima = changes.edad_minima.unwrap_or(current.edad_minima);
        let edad_maxima = changes.edad_maxima.unwrap_or(current.edad_maxima);
        let descripcion = changes.descripcion.unwrap_or(current.descripcion);
        let activo = changes.activo.unwrap_or(current.activo);

        sqlx::query(
            r#"
            UPDATE secciones
            SET nombre = ?, slug = ?, edad_minima = ?, edad_maxima = ?,
                descripcion = ?, activo = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&nombre)
        .bind(&slug)
        .bind(edad_minima)
        .bind(edad_maxima)
        .bind(&descripcion)
        .bind(i64::from(activo))
        .bind(now_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {SECTION_COLUMNS} FROM secciones WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_section(&row);

        tx.commit().await?;
        Ok(record)
    }

    /// Soft delete.
    pub async fn remove(&self, id: i64) -> Result<(), DbError> {
        let _t = QueryTimer::new("secciones.remove");
        let result: ExecResult =
            sqlx::query("UPDATE secciones SET activo = 0, updated_at = ? WHERE id = ?")
                .bind(now_rfc3339())
                .bind(id)
                .execute(self.pool)
                .await?
                .into();

        if result.rows_affected == 0 {
            return Err(DbError::NotFound {
                resource: "seccion",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
