//! Activity repository (calendar data source)
//!
//! Activities carry an RFC 3339 start/end and feed the calendar view
//! through the `desde`/`hasta` range filter. Soft-deleted rows stay out
//! of every listing unless asked for.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::{ExecResult, QueryTimer};
use crate::models::{ActivityStatus, Paginated, Pagination, ValidationError};

use super::{now_rfc3339, DbError};

#[derive(Debug, Clone)]
pub struct ActivityRecord {
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

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub lugar: Option<String>,
    pub fecha_inicio: String,
    pub fecha_fin: Option<String>,
    pub seccion_id: Option<i64>,
    pub estado: ActivityStatus,
}

impl NewActivity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.titulo.trim().is_empty() {
            return Err(ValidationError::Empty { field: "titulo" });
        }
        if let Some(fin) = &self.fecha_fin {
            if fin < &self.fecha_inicio {
                return Err(ValidationError::OutOfRange {
                    field: "fecha_fin",
                    reason: "must not precede fecha_inicio",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateActivity {
    pub titulo: Option<String>,
    pub descripcion: Option<Option<String>>,
    pub lugar: Option<Option<String>>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<Option<String>>,
    pub seccion_id: Option<Option<i64>>,
    pub estado: Option<ActivityStatus>,
}

/// Calendar filters, each optional.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilters {
    /// Inclusive lower bound on fecha_inicio (RFC 3339 or date prefix).
    pub desde: Option<String>,
    /// Inclusive upper bound on fecha_inicio.
    pub hasta: Option<String>,
    pub seccion_id: Option<i64>,
    pub estado: Option<ActivityStatus>,
}

const ACTIVITY_COLUMNS: &str = "id, titulo, descripcion, lugar, fecha_inicio, fecha_fin, \
                                seccion_id, estado, activo, created_at, updated_at";

fn map_activity(row: &SqliteRow) -> Result<ActivityRecord, DbError> {
    let estado: String = row.get("estado");
    let estado = ActivityStatus::parse(&estado).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(ActivityRecord {
        id: row.get("id"),
        titulo: row.get("titulo"),
        descripcion: row.get("descripcion"),
        lugar: row.get("lugar"),
        fecha_inicio: row.get("fecha_inicio"),
        fecha_fin: row.get("fecha_fin"),
        seccion_id: row.get("seccion_id"),
        estado,
        activo: row.get::<i64, _>("activo") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Append the WHERE clauses for [`ActivityFilters`], shared by the
/// listing SELECT and its fallback COUNT.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &ActivityFilters) {
    if let Some(desde) = &filters.desde {
        qb.push(" AND fecha_inicio >= ").push_bind(desde.clone());
    }
    if let Some(hasta) = &filters.hasta {
        // Date-only bounds ("2026-07-31") still cover the whole day:
        // append a high sentinel so the prefix compare is inclusive.
        let bound = if hasta.len() == 10 {
            format!("{hasta}~")
        } else {
            hasta.clone()
        };
        qb.push(" AND fecha_inicio <= ").push_bind(bound);
    }
    if let Some(seccion_id) = filters.seccion_id {
        qb.push(" AND seccion_id = ").push_bind(seccion_id);
    }
    if let Some(estado) = filters.estado {
        qb.push(" AND estado = ").push_bind(estado.as_str());
    }
}

/// Activity repository
pub struct ActivityRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ActivityRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List active activities in chronological order, applying the
    /// calendar range and the optional section/status filters.
    pub async fn list(
        &self,
        filters: &ActivityFilters,
        page: Pagination,
    ) -> Result<Paginated<ActivityRecord>, DbError> {
        let _t = QueryTimer::new("actividades.list");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ACTIVITY_COLUMNS}, COUNT(*) OVER() AS total FROM actividades WHERE activo = 1"
        ));
        push_filters(&mut qb, filters);

        qb.push(" ORDER BY fecha_inicio ASC, id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build().fetch_all(self.pool).await?;

        // Empty page: run the count separately so total survives.
        let total = match rows.first() {
            Some(row) => row.get("total"),
            None => {
                let mut qb: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT COUNT(*) FROM actividades WHERE activo = 1");
                push_filters(&mut qb, filters);
                qb.build_query_scalar().fetch_one(self.pool).await?
            }
        };
        let items = rows
            .iter()
            .map(map_activity)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: i64) -> Result<ActivityRecord, DbError> {
        let _t = QueryTimer::new("actividades.get");
        let row = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM actividades WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "actividad",
            id: id.to_string(),
        })?;

        map_activity(&row)
    }

    pub async fn create(&self, new: NewActivity) -> Result<ActivityRecord, DbError> {
        let _t = QueryTimer::new("actividades.create");
        let mut tx = self.pool.begin().await?;

        let now = now_rfc3339();
        let result: ExecResult = sqlx::query(
            r#"
            INSERT INTO actividades
                (titulo, descripcion, lugar, fecha_inicio, fecha_fin, seccion_id, estado, activo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&new.titulo)
        .bind(&new.descripcion)
        .bind(&new.lugar)
        .bind(&new.fecha_inicio)
        .bind(&new.fecha_fin)
        .bind(new.seccion_id)
        .bind(new.estado.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .into();

        let row = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM actividades WHERE id = ?"
        ))
        .bind(result.last_insert_id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_activity(&row)?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn update(&self, id: i64, changes: UpdateActivity) -> Result<ActivityRecord, DbError> {
        let _t = QueryTimer::new("actividades.update");
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM actividades WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "actividad",
            id: id.to_string(),
        })?;
        let current = map_activity(&row)?;

        let titulo = changes.titulo.unwrap_or(current.titulo);
        let descripcion = changes.descripcion.unwrap_or(current.descripcion);
        let lugar = changes.lugar.unwrap_or(current.lugar);
        let fecha_inicio = changes.fecha_inicio.unwrap_or(current.fecha_inicio);
        let fecha_fin = changes.fecha_fin.unwrap_or(current.fecha_fin);
        let seccion_id = changes.seccion_id.unwrap_or(current.seccion_id);
        let estado = changes.estado.unwrap_or(current.estado);

        sqlx::query(
            r#"
            UPDATE actividades
            SET titulo = ?, descripcion = ?, lugar = ?, fecha_inicio = ?, fecha_fin = ?,
                seccion_id = ?, estado = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&titulo)
        .bind(&descripcion)
        .bind(&lugar)
        .bind(&fecha_inicio)
        .bind(&fecha_fin)
        .bind(seccion_id)
        .bind(estado.as_str())
        .bind(now_rfc3339())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM actividades WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_activity(&row)?;

        tx.commit().await?;
        Ok(record)
    }

    /// Soft delete.
    pub async fn remove(&self, id: i64) -> Result<(), DbError> {
        let _t = QueryTimer::new("actividades.remove");
        let result: ExecResult =
            sqlx::query("UPDATE actividades SET activo = 0, updated_at = ? WHERE id = ?")
                .bind(now_rfc3339())
                .bind(id)
                .execute(self.pool)
                .await?
                .into();

        if result.rows_affected == 0 {
            return Err(DbError::NotFound {
                resource: "actividad",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
