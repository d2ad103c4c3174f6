//! Axum server setup
//!
//! Router assembly with localhost-only CORS by default, request
//! tracing, and graceful shutdown on SIGTERM/Ctrl+C.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tropa_core::AppConfig;

use super::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: AppConfig,
}

/// Build the application router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_permissive {
        tracing::warn!("CORS: permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        // Localhost only
        CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse().expect("static origin"),
                "http://localhost:8080".parse().expect("static origin"),
                "http://127.0.0.1:3000".parse().expect("static origin"),
                "http://127.0.0.1:8080".parse().expect("static origin"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::sections::router())
        .merge(routes::activities::router())
        .merge(routes::messages::router())
        .merge(routes::pages::router())
        .merge(routes::uploads::router());

    Router::new()
        .merge(routes::health::router())
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = open_pool(&config.database_path).await?;
/// init_schema(&pool).await?;
/// run_server(pool, config).await?;
/// ```
pub async fn run_server(pool: SqlitePool, config: AppConfig) -> Result<(), ServerError> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState { pool, config });
    let app = build_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use crate::auth::hash_password;
    use crate::db::repos::{NewUser, UserRepo};
    use crate::db::{init_schema, open_pool};
    use crate::models::{Email, Role};

    use super::*;

    async fn test_app() -> (TempDir, Router, SqlitePool) {
        let dir = TempDir::new().expect("tempdir");
        let pool = open_pool(&dir.path().join("test.db")).await.expect("pool");
        init_schema(&pool).await.expect("schema");

        let mut config = AppConfig::default();
        config.upload_dir = dir.path().join("uploads");
        std::fs::create_dir_all(&config.upload_dir).expect("uploads dir");

        let state = Arc::new(AppState {
            pool: pool.clone(),
            config,
        });
        (dir, build_router(state), pool)
    }

    async fn seed_user(pool: &SqlitePool, email: &str, rol: Role) {
        UserRepo::new(pool)
            .create(NewUser {
                email: Email::new(email).unwrap(),
                nombre: "Prueba".into(),
                rol,
                seccion_id: None,
                password_hash: hash_password("contrasena"),
            })
            .await
            .unwrap();
    }

    async fn login(app: &Router, email: &str) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"email": email, "password": "contrasena"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["token"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_dir, app, _pool) = test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_then_me() {
        let (_dir, app, pool) = test_app().await;
        seed_user(&pool, "ana@example.org", Role::Admin).await;

        let token = login(&app, "ana@example.org").await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["email"], "ana@example.org");
        // The hash never crosses the wire.
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_401() {
        let (_dir, app, pool) = test_app().await;
        seed_user(&pool, "ana@example.org", Role::Admin).await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"email": "ana@example.org", "password": "mala"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_rejects_anonymous() {
        let (_dir, app, _pool) = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/usuarios")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn familia_cannot_create_activities() {
        let (_dir, app, pool) = test_app().await;
        seed_user(&pool, "familia@example.org", Role::Familia).await;
        let token = login(&app, "familia@example.org").await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/actividades")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "titulo": "Acampada",
                            "fecha_inicio": "2026-09-12T10:00:00Z"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn pages_flow_published_vs_draft() {
        let (_dir, app, pool) = test_app().await;
        seed_user(&pool, "scouter@example.org", Role::Scouter).await;
        let token = login(&app, "scouter@example.org").await;

        // Create a draft page
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/paginas")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "titulo": "Quiénes somos",
                            "contenido": "# Grupo\n\n**Desde 1985.**"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["slug"], "quienes-somos");
        assert!(body["html"].as_str().unwrap().contains("<h1>Grupo</h1>"));

        // Draft is invisible to anonymous visitors
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/paginas/quienes-somos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Publish it
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/paginas/quienes-somos")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"publicada": true}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Now the anonymous view works
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/paginas/quienes-somos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_invalidates_token() {
        let (_dir, app, pool) = test_app().await;
        seed_user(&pool, "ana@example.org", Role::Admin).await;
        let token = login(&app, "ana@example.org").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
