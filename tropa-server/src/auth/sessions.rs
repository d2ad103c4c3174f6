//! Bearer-token sessions
//!
//! Opaque random tokens stored server-side in `sesiones` with an
//! expiry. The client keeps the token (and its expiry, for a cheap
//! local check) and sends it back as `Authorization: Bearer <token>`.
//! Expired rows are ignored on lookup and swept opportunistically.

use chrono::{Duration, SecondsFormat, Utc};
use rand::RngCore;
use sqlx::{Row, SqlitePool};

use crate::db::repos::users::UserRecord;
use crate::db::{DbError, QueryTimer};
use crate::models::Role;

/// Token length in bytes before hex encoding.
const TOKEN_LEN: usize = 32;

/// An issued session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub usuario_id: i64,
    pub expires_at: String,
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Session repository
pub struct SessionRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a new session for a user.
    pub async fn create(&self, usuario_id: i64, ttl_hours: i64) -> Result<Session, DbError> {
        let _t = QueryTimer::new("sesiones.create");
        let token = generate_token();
        let expires_at = (Utc::now() + Duration::hours(ttl_hours))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        sqlx::query(
            "INSERT INTO sesiones (token, usuario_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(usuario_id)
        .bind(now())
        .bind(&expires_at)
        .execute(self.pool)
        .await?;

        Ok(Session {
            token,
            usuario_id,
            expires_at,
        })
    }

    /// Resolve a token to its active user. Expired sessions and inactive
    /// users resolve to None.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserRecord>, DbError> {
        let _t = QueryTimer::new("sesiones.resolve");
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.nombre, u.rol, u.seccion_id, u.activo,
                   u.created_at, u.updated_at
            FROM sesiones s
            JOIN usuarios u ON u.id = s.usuario_id
            WHERE s.token = ? AND s.expires_at > ? AND u.activo = 1
            "#,
        )
        .bind(token)
        .bind(now())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let rol: String = row.get("rol");
        let rol = Role::parse(&rol).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Some(UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            nombre: row.get("nombre"),
            rol,
            seccion_id: row.get("seccion_id"),
            activo: true,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Delete a session (logout). Deleting an unknown token is a no-op.
    pub async fn delete(&self, token: &str) -> Result<(), DbError> {
        let _t = QueryTimer::new("sesiones.delete");
        sqlx::query("DELETE FROM sesiones WHERE token = ?")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Sweep expired rows. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> Result<u64, DbError> {
        let _t = QueryTimer::new("sesiones.cleanup");
        let result = sqlx::query("DELETE FROM sesiones WHERE expires_at <= ?")
            .bind(now())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::test_pool;
    use crate::db::repos::users::{NewUser, UserRepo};
    use crate::models::{Email, Role};

    async fn user(pool: &SqlitePool) -> i64 {
        UserRepo::new(pool)
            .create(NewUser {
                email: Email::new("socia@example.org").unwrap(),
                nombre: "Socia".into(),
                rol: Role::Familia,
                seccion_id: None,
                password_hash: "salt$digest".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn issued_token_resolves_to_user() {
        let (_dir, pool) = test_pool().await;
        let id = user(&pool).await;
        let repo = SessionRepo::new(&pool);

        let session = repo.create(id, 24).await.unwrap();
        let resolved = repo.resolve(&session.token).await.unwrap().unwrap();
        assert_eq!(resolved.id, id);
        assert_eq!(resolved.rol, Role::Familia);
    }

    #[tokio::test]
    async fn unknown_token_resolves_none() {
        let (_dir, pool) = test_pool().await;
        let repo = SessionRepo::new(&pool);
        assert!(repo.resolve("feedfacecafe").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_swept() {
        let (_dir, pool) = test_pool().await;
        let id = user(&pool).await;
        let repo = SessionRepo::new(&pool);

        // Negative TTL expires the session in the past.
        let session = repo.create(id, -1).await.unwrap();
        assert!(repo.resolve(&session.token).await.unwrap().is_none());

        let swept = repo.cleanup_expired().await.unwrap();
        assert_eq!(swept, 1);
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let (_dir, pool) = test_pool().await;
        let id = user(&pool).await;
        let repo = SessionRepo::new(&pool);

        let session = repo.create(id, 24).await.unwrap();
        repo.delete(&session.token).await.unwrap();
        assert!(repo.resolve(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deactivated_user_loses_sessions() {
        let (_dir, pool) = test_pool().await;
        let id = user(&pool).await;
        let sessions = SessionRepo::new(&pool);

        let session = sessions.create(id, 24).await.unwrap();
        UserRepo::new(&pool).remove(id).await.unwrap();
        assert!(sessions.resolve(&session.token).await.unwrap().is_none());
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_LEN * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
