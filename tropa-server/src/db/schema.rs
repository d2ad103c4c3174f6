//! Schema creation for the portal tables
//!
//! All invariants the application relies on are declared here:
//! UNIQUE email/slug, CHECK-constrained enums and age ranges, and the
//! cascade/restrict rules between tables. Statements are idempotent
//! (CREATE ... IF NOT EXISTS) and run at startup.

use sqlx::SqlitePool;

use super::DbError;

/// Create all tables and indexes.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
    tracing::info!("Initializing portal schema...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS secciones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            edad_minima INTEGER NOT NULL CHECK (edad_minima >= 5),
            edad_maxima INTEGER NOT NULL CHECK (edad_maxima <= 21 AND edad_maxima >= edad_minima),
            descripcion TEXT,
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS usuarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            nombre TEXT NOT NULL,
            rol TEXT NOT NULL CHECK (rol IN ('admin','comite','scouter','familia','educando')),
            seccion_id INTEGER REFERENCES secciones(id) ON DELETE SET NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS actividades (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo TEXT NOT NULL,
            descripcion TEXT,
            lugar TEXT,
            fecha_inicio TEXT NOT NULL,
            fecha_fin TEXT,
            seccion_id INTEGER REFERENCES secciones(id) ON DELETE SET NULL,
            estado TEXT NOT NULL DEFAULT 'planificada'
                CHECK (estado IN ('planificada','confirmada','cancelada','finalizada')),
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documentos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            nombre_archivo TEXT NOT NULL UNIQUE,
            mime TEXT NOT NULL,
            tamano INTEGER NOT NULL,
            subido_por INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE RESTRICT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mensajes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            remitente_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            destinatario_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            asunto TEXT,
            cuerpo TEXT NOT NULL,
            leido INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS paginas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            titulo TEXT NOT NULL,
            contenido TEXT NOT NULL DEFAULT '',
            publicada INTEGER NOT NULL DEFAULT 0,
            actualizado_por INTEGER REFERENCES usuarios(id) ON DELETE SET NULL,
            activo INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sesiones (
            token TEXT PRIMARY KEY,
            usuario_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_indexes(pool).await?;

    tracing::info!("Schema ready");
    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_usuarios_rol ON usuarios(rol)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_usuarios_seccion ON usuarios(seccion_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_actividades_inicio ON actividades(fecha_inicio)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_actividades_seccion ON actividades(seccion_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_mensajes_destinatario ON mensajes(destinatario_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_mensajes_no_leidos ON mensajes(destinatario_id) WHERE leido = 0",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sesiones_usuario ON sesiones(usuario_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sesiones_expira ON sesiones(expires_at)")
        .execute(pool)
        .await?;

    Ok(())
}
