//! Schema versioning (spec §4.3): forward-only migrations applied at
//! startup. An unknown future migration marker is treated as fatal.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::CoreError;

refinery::embed_migrations!("migrations");

pub type DbPool = Pool<SqliteConnectionManager>;

/// Build the connection pool (spec §5: "DB connection pool: owned by C3,
/// size configurable (default 20, overflow 10, recycle 3600 s)").
pub fn build_pool(
    database_path: &str,
    pool_size: u32,
    recycle_secs: u64,
) -> Result<DbPool, CoreError> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")
    });
    Pool::builder()
        .max_size(pool_size)
        .connection_timeout(std::time::Duration::from_secs(30))
        .idle_timeout(Some(std::time::Duration::from_secs(recycle_secs)))
        .build(manager)
        .map_err(|e| CoreError::Fatal(format!("failed to build DB pool: {e}")))
}

/// Run embedded migrations. Refuses to start if the schema history table
/// records a migration newer than any this binary knows about — spec §4.3
/// "presence of an unknown future migration marker is treated as fatal".
pub fn run_migrations(pool: &DbPool) -> Result<(), CoreError> {
    let mut conn = pool
        .get()
        .map_err(|e| CoreError::Fatal(format!("failed to acquire migration connection: {e}")))?;

    let runner = migrations::runner();
    let known_latest = runner
        .get_migrations()
        .iter()
        .map(|m| m.version())
        .max()
        .unwrap_or(0);

    if let Ok(applied) = runner.get_applied_migrations(&mut *conn) {
        if let Some(newest_applied) = applied.iter().map(|m| m.version()).max() {
            if newest_applied > known_latest {
                return Err(CoreError::Fatal(format!(
                    "database has migration v{newest_applied} applied, \
                     but this binary only knows up to v{known_latest}"
                )));
            }
        }
    }

    runner
        .run(&mut *conn)
        .map_err(|e| CoreError::Fatal(format!("migration failed: {e}")))?;
    Ok(())
}
