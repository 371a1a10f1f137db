//! Schema history of the document store.
//!
//! The applied schema version lives in SQLite's `user_version` header field.
//! Each step runs in its own transaction together with the version bump, so a
//! failed step leaves the file at the previous version.

use tokio_rusqlite::Connection;

use crate::Error;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, name: "documents", sql: include_str!("../../migrations/001_documents.sql") }];

/// Schema version this build writes.
pub const LATEST_VERSION: i64 = 1;

/// Bring the store up to [`LATEST_VERSION`].
///
/// A file whose version is newer than this build knows about is refused
/// rather than written with an older schema.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if current > LATEST_VERSION {
            return Err(Error::MigrationFailed(format!(
                "store schema version {current} is newer than supported version {LATEST_VERSION}"
            )));
        }

        for step in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(step.sql)
                .map_err(|e| Error::MigrationFailed(format!("{} (v{}): {e}", step.name, step.version)))?;
            tx.pragma_update(None, "user_version", step.version)?;
            tx.commit()?;
            tracing::info!(version = step.version, name = step.name, "applied store migration");
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}
