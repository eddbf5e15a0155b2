//! Schema versioning for the response cache.
//!
//! The applied version lives in SQLite's `user_version` header field. Each
//! step runs in its own transaction together with the version bump.

use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite;

use super::Error;

struct Step {
    version: i64,
    sql: &'static str,
}

/// Ordered schema steps. Versions are contiguous from 1.
const STEPS: &[Step] = &[Step { version: 1, sql: include_str!("../../migrations/001_responses.sql") }];

/// Newest schema version this build knows about.
pub const SCHEMA_VERSION: i64 = 1;

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to [`SCHEMA_VERSION`].
///
/// A database written by a newer build is refused rather than downgraded.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = schema_version(conn)?;
        if current > SCHEMA_VERSION {
            return Err(Error::MigrationFailed(format!(
                "cache schema v{current} is newer than supported v{SCHEMA_VERSION}"
            )));
        }

        for step in STEPS.iter().filter(|s| s.version > current) {
            tracing::debug!(version = step.version, "applying cache schema step");
            let tx = conn.transaction()?;
            tx.execute_batch(step.sql)
                .map_err(|e| Error::MigrationFailed(format!("step {}: {e}", step.version)))?;
            tx.pragma_update(None, "user_version", step.version)?;
            tx.commit()?;
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}
