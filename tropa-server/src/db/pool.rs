//! SQLite connection pool
//!
//! Opens the single database file with the tuning the portal relies on:
//! WAL journal so readers survive a writer, foreign keys on, a busy
//! timeout instead of immediate SQLITE_BUSY, relaxed sync (safe under
//! WAL), and a larger page cache. A second set of optional pragmas is
//! applied after connecting; those are logged and skipped on failure
//! rather than aborting startup.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::DbError;

/// Maximum pool connections. Single-writer workload, kept small.
const MAX_CONNECTIONS: u32 = 5;

/// Busy timeout before a locked database surfaces an error.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Optional tuning pragmas applied after connect. A failure here is
/// logged, not raised.
const TUNING_PRAGMAS: &[&str] = &[
    "PRAGMA temp_store = MEMORY",
    "PRAGMA mmap_size = 134217728",
];

/// Open the database file, creating it (and parent directories) if
/// missing, and return a configured pool.
pub async fn open_pool(db_path: &Path) -> Result<SqlitePool, DbError> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DbError::Io {
                context: format!("creating database directory {}", parent.display()),
                source: e,
            }
        })?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .map_err(DbError::Sqlx)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .pragma("cache_size", "-64000"); // 64MB page cache

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    apply_tuning(&pool).await;

    Ok(pool)
}

/// Apply the optional tuning pragmas sequentially, warning on failure.
async fn apply_tuning(pool: &SqlitePool) {
    for pragma in TUNING_PRAGMAS {
        if let Err(e) = sqlx::query(pragma).execute(pool).await {
            tracing::warn!(pragma, error = %e, "tuning pragma failed, continuing");
        }
    }
}
