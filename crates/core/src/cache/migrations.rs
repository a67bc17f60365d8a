//! Versioned schema for the SQLite cache store.
//!
//! `_migrations` records every applied step. Steps newer than the recorded
//! maximum are applied in order, each inside its own transaction together
//! with its bookkeeping row.

use super::Error;
use tokio_rusqlite::rusqlite::{self, Connection as RawConnection};
use tokio_rusqlite::{Connection, params};

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "generations",
    sql: include_str!("../../migrations/001_generations.sql"),
}];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] naming the step whose SQL was rejected.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(BOOKKEEPING, [])?;
        let applied = current_version(conn)?;

        for step in MIGRATIONS.iter().filter(|m| m.version > applied) {
            apply(conn, step)
                .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", step.version, step.name)))?;
            tracing::debug!(version = step.version, name = step.name, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

/// Highest applied migration, 0 for a fresh database.
pub(crate) fn current_version(conn: &RawConnection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
}

fn apply(conn: &mut RawConnection, step: &Migration) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![step.version, step.name, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}
