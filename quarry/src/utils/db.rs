// Catalog store connection handling with one-shot recovery

use crate::error::{CatalogError, Result};
use crate::utils::migrations::{run_pending, Migration};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// `<store>.bak`, where a store that failed to open is moved.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Open a connection with foreign key enforcement switched on.
pub fn establish(path: &Path) -> Result<SqliteConnection> {
    let url = path.to_string_lossy();
    let mut conn = SqliteConnection::establish(&url)?;
    conn.batch_execute("PRAGMA foreign_keys = ON")?;
    Ok(conn)
}

fn open_migrated(path: &Path, migrations: &[Migration]) -> Result<SqliteConnection> {
    let mut conn = establish(path)?;
    let version = run_pending(&mut conn, migrations)?;
    log::debug!("Catalog store {:?} at schema version {}", path, version);
    Ok(conn)
}

fn unavailable(path: &Path) -> impl FnOnce(std::io::Error) -> CatalogError + '_ {
    move |source| CatalogError::StoreUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

/// Move a broken store to its backup slot, replacing any earlier backup.
fn set_aside(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    match fs::remove_file(&backup) {
        Ok(()) => log::debug!("Removed previous backup {:?}", backup),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(unavailable(&backup)(e)),
    }

    if path.exists() {
        fs::rename(path, &backup).map_err(unavailable(path))?;
        log::warn!("Moved catalog store {:?} to {:?}", path, backup);
    }
    Ok(())
}

/// Open the store at `path` and bring its schema up to date.
///
/// If that fails for any reason the file is moved to [`backup_path`] and a
/// fresh store is created in its place, once. A failure on the fresh store is
/// returned as [`CatalogError::SchemaMigrationFailed`].
pub fn open_with_recovery(path: &Path, migrations: &[Migration]) -> Result<SqliteConnection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(unavailable(parent))?;
    }

    let first = match open_migrated(path, migrations) {
        Ok(conn) => return Ok(conn),
        Err(e) => e,
    };

    log::warn!(
        "Catalog store {:?} could not be opened ({}), recreating it",
        path,
        first
    );
    set_aside(path)?;

    open_migrated(path, migrations).map_err(|source| {
        log::error!("Recreated catalog store {:?} failed as well: {}", path, source);
        CatalogError::SchemaMigrationFailed {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::migrations::{current_version, MIGRATIONS};

    #[test]
    fn creates_missing_store_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");

        let mut conn = open_with_recovery(&path, MIGRATIONS).unwrap();
        assert!(path.exists());
        assert_eq!(current_version(&mut conn).unwrap(), 2);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn corrupt_store_is_backed_up_and_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        let garbage = vec![0x5a_u8; 4096];
        fs::write(&path, &garbage).unwrap();
        fs::write(backup_path(&path), b"stale backup").unwrap();

        let mut conn = open_with_recovery(&path, MIGRATIONS).unwrap();
        assert_eq!(current_version(&mut conn).unwrap(), 2);
        assert_eq!(fs::read(backup_path(&path)).unwrap(), garbage);
    }

    #[test]
    fn failure_after_recovery_is_fatal() {
        static ALWAYS_FAILS: &[Migration] = &[Migration {
            version: 1,
            description: "broken",
            up_sql: "NOT VALID SQL;",
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.db");
        fs::write(&path, b"").unwrap();

        let Err(err) = open_with_recovery(&path, ALWAYS_FAILS) else {
            panic!("recovery should not succeed with a broken migration");
        };
        match err {
            CatalogError::SchemaMigrationFailed { source, .. } => {
                assert!(matches!(*source, CatalogError::Migration { version: 1, .. }));
            }
            other => panic!("expected SchemaMigrationFailed, got {other:?}"),
        }
        assert!(backup_path(&path).exists());
    }

    #[test]
    fn unwritable_location_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"plain file").unwrap();

        let Err(err) = open_with_recovery(&blocker.join("data.db"), MIGRATIONS) else {
            panic!("a store under a regular file cannot open");
        };
        assert!(matches!(err, CatalogError::StoreUnavailable { .. }));
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = open_with_recovery(&dir.path().join("data.db"), MIGRATIONS).unwrap();
        let orphan = conn.batch_execute(
            "INSERT INTO modversion (modid, version, url, packing, filename) \
             VALUES ('x:y', '1', 'http://h/f', 'raw', 'f');",
        );
        assert!(orphan.is_err());
    }
}
