//! User repository
//!
//! List/search with conditional filters, create/update with uniqueness
//! checks inside their own transaction, soft delete via the `activo`
//! flag. Password hashes never leave this module except through
//! [`UserRepo::get_auth_by_email`], which the login handler uses.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::{ExecResult, QueryTimer};
use crate::models::{Email, Paginated, Pagination, Role};

use super::{now_rfc3339, DbError};

/// User row as exposed to the rest of the crate (no password hash).
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub nombre: String,
    pub rol: Role,
    pub seccion_id: Option<i64>,
    pub activo: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for creating a user. The password arrives pre-hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub nombre: String,
    pub rol: Role,
    pub seccion_id: Option<i64>,
    pub password_hash: String,
}

/// Partial update; None fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<Email>,
    pub nombre: Option<String>,
    pub rol: Option<Role>,
    pub seccion_id: Option<Option<i64>>,
    pub activo: Option<bool>,
}

impl UpdateUser {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.nombre.is_none()
            && self.rol.is_none()
            && self.seccion_id.is_none()
            && self.activo.is_none()
    }
}

/// List filters, each optional.
#[derive(Debug, Clone, Default)]
pub struct UserFilters {
    pub rol: Option<Role>,
    pub seccion_id: Option<i64>,
    pub activo: Option<bool>,
    /// Free-text match against nombre and email.
    pub q: Option<String>,
}

const USER_COLUMNS: &str = "id, email, nombre, rol, seccion_id, activo, created_at, updated_at";

fn map_user(row: &SqliteRow) -> Result<UserRecord, DbError> {
    let rol: String = row.get("rol");
    let rol = Role::parse(&rol).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        nombre: row.get("nombre"),
        rol,
        seccion_id: row.get("seccion_id"),
        activo: row.get::<i64, _>("activo") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Append the WHERE clauses for [`UserFilters`], shared by the listing
/// SELECT and its fallback COUNT.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &UserFilters) {
    if let Some(rol) = filters.rol {
        qb.push(" AND rol = ").push_bind(rol.as_str());
    }
    if let Some(seccion_id) = filters.seccion_id {
        qb.push(" AND seccion_id = ").push_bind(seccion_id);
    }
    if let Some(activo) = filters.activo {
        qb.push(" AND activo = ").push_bind(i64::from(activo));
    }
    if let Some(q) = filters.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let like = format!("%{}%", q.trim());
        qb.push(" AND (nombre LIKE ")
            .push_bind(like.clone())
            .push(" OR email LIKE ")
            .push_bind(like)
            .push(")");
    }
}

/// User repository
pub struct UserRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List users with conditional filters, newest first.
    pub async fn list(
        &self,
        filters: &UserFilters,
        page: Pagination,
    ) -> Result<Paginated<UserRecord>, DbError> {
        let _t = QueryTimer::new("usuarios.list");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total FROM usuarios WHERE 1=1"
        ));
        push_filters(&mut qb, filters);

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build().fetch_all(self.pool).await?;

        // A page past the end has no rows to carry the window total, so
        // the count runs on its own.
        let total = match rows.first() {
            Some(row) => row.get("total"),
            None => {
                let mut qb: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT COUNT(*) FROM usuarios WHERE 1=1");
                push_filters(&mut qb, filters);
                qb.build_query_scalar().fetch_one(self.pool).await?
            }
        };
        let items = rows
            .iter()
            .map(map_user)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    /// Get a single user by id.
    pub async fn get(&self, id: i64) -> Result<UserRecord, DbError> {
        let _t = QueryTimer::new("usuarios.get");
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound {
            resource: "usuario",
            id: id.to_string(),
        })?;

        map_user(&row)
    }

    /// Fetch an active user plus password hash for login verification.
    pub async fn get_auth_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(UserRecord, String)>, DbError> {
        let _t = QueryTimer::new("usuarios.get_auth_by_email");
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM usuarios WHERE email = ? AND activo = 1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => {
                let hash: String = row.get("password_hash");
                Ok(Some((map_user(&row)?, hash)))
            }
            None => Ok(None),
        }
    }

    /// Create a user: uniqueness pre-check and INSERT in one transaction.
    pub async fn create(&self, new: NewUser) -> Result<UserRecord, DbError> {
        let _t = QueryTimer::new("usuarios.create");
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM usuarios WHERE email = ?")
            .bind(new.email.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(DbError::Conflict {
                resource: "usuario",
                field: "email",
                value: new.email.into_string(),
            });
        }

        let now = now_rfc3339();
        let result: ExecResult = sqlx::query(
            r#"
            INSERT INTO usuarios (email, password_hash, nombre, rol, seccion_id, activo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(new.email.as_str())
        .bind(&new.password_hash)
        .bind(&new.nombre)
        .bind(new.rol.as_str())
        .bind(new.seccion_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?
        .into();

        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = ?"
        ))
        .bind(result.last_insert_id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_user(&row)?;

        tx.commit().await?;
        Ok(record)
    }

    /// Apply a partial update inside a transaction. Re-checks email
    /// uniqueness when the email changes.
    pub async fn update(&self, id: i64, changes: UpdateUser) -> Result<UserRecord, DbError> {
        let _t = QueryTimer::new("usuarios.update");
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::NotFound {
                resource: "usuario",
                id: id.to_string(),
            });
        }

        if let Some(email) = &changes.email {
            let taken = sqlx::query("SELECT id FROM usuarios WHERE email = ? AND id != ?")
                .bind(email.as_str())
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if taken.is_some() {
                return Err(DbError::Conflict {
                    resource: "usuario",
                    field: "email",
                    value: email.as_str().to_owned(),
                });
            }
        }

        if !changes.is_empty() {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE usuarios SET ");
            let mut set = qb.separated(", ");
            if let Some(email) = &changes.email {
                set.push("email = ").push_bind_unseparated(email.as_str());
            }
            if let Some(nombre) = &changes.nombre {
                set.push("nombre = ").push_bind_unseparated(nombre.clone());
            }
            if let Some(rol) = changes.rol {
                set.push("rol = ").push_bind_unseparated(rol.as_str());
            }
            if let Some(seccion_id) = changes.seccion_id {
                set.push("seccion_id = ").push_bind_unseparated(seccion_id);
            }
            if let Some(activo) = changes.activo {
                set.push("activo = ").push_bind_unseparated(i64::from(activo));
            }
            set.push("updated_at = ").push_bind_unseparated(now_rfc3339());
            qb.push(" WHERE id = ").push_bind(id);

            qb.build().execute(&mut *tx).await?;
        }

        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM usuarios WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let record = map_user(&row)?;

        tx.commit().await?;
        Ok(record)
    }

    /// Replace the stored password hash.
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), DbError> {
        let _t = QueryTimer::new("usuarios.set_password");
        let result: ExecResult =
            sqlx::query("UPDATE usuarios SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(now_rfc3339())
                .bind(id)
                .execute(self.pool)
                .await?
                .into();

        if result.rows_affected == 0 {
            return Err(DbError::NotFound {
                resource: "usuario",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Soft delete: flip `activo` to 0. The row survives.
    pub async fn remove(&self, id: i64) -> Result<(), DbError> {
        let _t = QueryTimer::new("usuarios.remove");
        let mut tx = self.pool.begin().await?;

        let result: ExecResult =
            sqlx::query("UPDATE usuarios SET activo = 0, updated_at = ? WHERE id = ?")
                .bind(now_rfc3339())
                .bind(id)
                .execute(&mut *tx)
                .await?
                .into();

        if result.rows_affected == 0 {
            return Err(DbError::NotFound {
                resource: "usuario",
                id: id.to_string(),
            });
        }

        // Sessions die with the account.
        sqlx::query("DELETE FROM sesiones WHERE usuario_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::test_pool;

    fn new_user(email: &str, rol: Role) -> NewUser {
        NewUser {
            email: Email::new(email).unwrap(),
            nombre: "Prueba".into(),
            rol,
            seccion_id: None,
            password_hash: "salt$digest".into(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        let created = repo
            .create(new_user("jefa@example.org", Role::Comite))
            .await
            .unwrap();
        let fetched = repo.get(created.id).await.unwrap();

        assert_eq!(fetched.email, "jefa@example.org");
        assert_eq!(fetched.nombre, created.nombre);
        assert_eq!(fetched.rol, Role::Comite);
        assert!(fetched.activo);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_leaves_one_row() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        repo.create(new_user("dup@example.org", Role::Familia))
            .await
            .unwrap();
        let err = repo
            .create(new_user("dup@example.org", Role::Familia))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { field: "email", .. }));

        let listed = repo
            .list(&UserFilters::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
    }

    #[tokio::test]
    async fn page_past_the_end_keeps_total() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        repo.create(new_user("ana@example.org", Role::Familia))
            .await
            .unwrap();
        repo.create(new_user("berto@example.org", Role::Familia))
            .await
            .unwrap();

        let beyond = repo
            .list(&UserFilters::default(), Pagination::new(5, 25))
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 2);

        // Filters still apply to the fallback count.
        let filtered = repo
            .list(
                &UserFilters {
                    q: Some("ana".into()),
                    ..Default::default()
                },
                Pagination::new(5, 25),
            )
            .await
            .unwrap();
        assert_eq!(filtered.total, 1);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_partial_row() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        // Dangling seccion_id violates the FK mid-transaction.
        let mut user = new_user("huerfano@example.org", Role::Educando);
        user.seccion_id = Some(9999);
        assert!(repo.create(user).await.is_err());

        let email = Email::new("huerfano@example.org").unwrap();
        let auth = repo.get_auth_by_email(&email).await.unwrap();
        assert!(auth.is_none());
    }

    #[tokio::test]
    async fn soft_delete_flips_activo_without_removing_row() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        let user = repo
            .create(new_user("baja@example.org", Role::Scouter))
            .await
            .unwrap();
        repo.remove(user.id).await.unwrap();

        let fetched = repo.get(user.id).await.unwrap();
        assert!(!fetched.activo);

        let inactive = repo
            .list(
                &UserFilters {
                    activo: Some(false),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(inactive.total, 1);
    }

    #[tokio::test]
    async fn remove_missing_user_is_not_found() {
        let (_dir, pool) = test_pool().await;
        let err = UserRepo::new(&pool).remove(42).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn partial_update_changes_only_given_fields() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        let user = repo
            .create(new_user("cambio@example.org", Role::Familia))
            .await
            .unwrap();
        let updated = repo
            .update(
                user.id,
                UpdateUser {
                    nombre: Some("Nuevo Nombre".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.nombre, "Nuevo Nombre");
        assert_eq!(updated.email, "cambio@example.org");
        assert_eq!(updated.rol, Role::Familia);
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        repo.create(new_user("uno@example.org", Role::Familia))
            .await
            .unwrap();
        let dos = repo
            .create(new_user("dos@example.org", Role::Familia))
            .await
            .unwrap();

        let err = repo
            .update(
                dos.id,
                UpdateUser {
                    email: Some(Email::new("uno@example.org").unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn list_filters_by_role_and_text() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        repo.create(NewUser {
            nombre: "Marta Jefa".into(),
            ..new_user("marta@example.org", Role::Scouter)
        })
        .await
        .unwrap();
        repo.create(new_user("familia@example.org", Role::Familia))
            .await
            .unwrap();

        let scouters = repo
            .list(
                &UserFilters {
                    rol: Some(Role::Scouter),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(scouters.total, 1);
        assert_eq!(scouters.items[0].email, "marta@example.org");

        let by_text = repo
            .list(
                &UserFilters {
                    q: Some("marta".into()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_text.total, 1);
    }

    #[tokio::test]
    async fn login_lookup_skips_inactive_users() {
        let (_dir, pool) = test_pool().await;
        let repo = UserRepo::new(&pool);

        let user = repo
            .create(new_user("activa@example.org", Role::Comite))
            .await
            .unwrap();
        let email = Email::new("activa@example.org").unwrap();
        assert!(repo.get_auth_by_email(&email).await.unwrap().is_some());

        repo.remove(user.id).await.unwrap();
        assert!(repo.get_auth_by_email(&email).await.unwrap().is_none());
    }
}
