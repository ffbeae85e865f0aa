// Schema migrations, tracked in SQLite's `user_version` header field.
// The migration list itself is in definitions.rs.

mod definitions;

pub use definitions::MIGRATIONS;

use crate::error::{CatalogError, Result};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Integer;

/// A single forward-only schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Value `user_version` holds once this migration has been applied
    pub version: i32,
    /// Human-readable description of what this migration does
    pub description: &'static str,
    /// SQL batch applying the migration
    pub up_sql: &'static str,
}

#[derive(QueryableByName)]
struct UserVersion {
    #[diesel(sql_type = Integer)]
    user_version: i32,
}

/// Schema version recorded in the database header; 0 for a new file.
pub fn current_version(conn: &mut SqliteConnection) -> QueryResult<i32> {
    diesel::sql_query("PRAGMA user_version")
        .get_result::<UserVersion>(conn)
        .map(|v| v.user_version)
}

/// Apply every migration newer than the recorded version, in version order.
///
/// Each migration and its version bump commit together, so a failure leaves
/// the store at the last fully applied version. Returns the resulting version.
pub fn run_pending(conn: &mut SqliteConnection, migrations: &[Migration]) -> Result<i32> {
    let mut current = current_version(conn)?;

    let mut pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > current).collect();
    pending.sort_by_key(|m| m.version);

    if pending.is_empty() {
        log::debug!("Catalog schema is current at version {}", current);
        return Ok(current);
    }

    for migration in pending {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            conn.batch_execute(migration.up_sql)?;
            conn.batch_execute(&format!("PRAGMA user_version = {}", migration.version))?;
            Ok(())
        })
        .map_err(|source| CatalogError::Migration {
            version: migration.version,
            source,
        })?;

        log::info!(
            "Applied migration {}: {}",
            migration.version,
            migration.description
        );
        current = migration.version;
    }

    Ok(current)
}
