use crate::error::{CatalogError, Result};
use crate::models::{
    DependencyRecord, EntryHashRecord, Mod, ModRecord, ModVersion, ModVersionRecord,
};
use crate::schema::{moddependency, modentryhash, mods, modversion};
use crate::utils::db::open_with_recovery;
use crate::utils::migrations::{current_version, Migration, MIGRATIONS};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::BigInt;
use quarry_lib::Identifier;
use std::collections::HashMap;
use std::path::Path;

/// Insertion order; versions and edges keep the order they were declared in.
fn rowid() -> diesel::expression::SqlLiteral<BigInt> {
    sql::<BigInt>("rowid")
}

/// Durable storage for mods, versions, dependency edges and entry hashes.
pub struct CatalogStore {
    conn: SqliteConnection,
}

impl CatalogStore {
    /// Open (creating and migrating as needed) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, MIGRATIONS)
    }

    pub fn open_with(path: &Path, migrations: &[Migration]) -> Result<Self> {
        let conn = open_with_recovery(path, migrations)?;
        log::info!("Opened catalog store {:?}", path);
        Ok(Self { conn })
    }

    pub fn schema_version(&mut self) -> Result<i32> {
        Ok(current_version(&mut self.conn)?)
    }

    pub fn load_mods(&mut self) -> Result<Vec<Mod>> {
        let records = mods::table
            .order(rowid())
            .select(ModRecord::as_select())
            .load(&mut self.conn)?;

        records
            .into_iter()
            .map(|record| {
                let versions = self.load_versions(&record.id)?;
                Mod::from_record(record, versions)
            })
            .collect()
    }

    /// Versions of one mod with their dependency lists attached.
    pub fn load_versions(&mut self, mod_key: &str) -> Result<Vec<ModVersion>> {
        let records = modversion::table
            .filter(modversion::modid.eq(mod_key))
            .order(rowid())
            .select(ModVersionRecord::as_select())
            .load(&mut self.conn)?;

        let mut edges: HashMap<String, Vec<DependencyRecord>> = HashMap::new();
        for edge in moddependency::table
            .filter(moddependency::modid.eq(mod_key))
            .order(rowid())
            .select(DependencyRecord::as_select())
            .load(&mut self.conn)?
        {
            edges.entry(edge.version.clone()).or_default().push(edge);
        }

        records
            .into_iter()
            .map(|record| {
                let deps = edges.remove(&record.version).unwrap_or_default();
                ModVersion::from_records(record, deps)
            })
            .collect()
    }

    /// Upsert a mod with all of its versions and edges in one transaction.
    ///
    /// Each saved version's edges are replaced as a set. Versions absent from
    /// `m` are left in place.
    pub fn save_mod(&mut self, m: &Mod) -> Result<()> {
        self.conn.transaction::<_, CatalogError, _>(|conn| {
            let record = m.to_record();
            diesel::insert_into(mods::table)
                .values(&record)
                .on_conflict(mods::id)
                .do_update()
                .set(&record)
                .execute(conn)?;

            for version in &m.versions {
                let record = version.to_record();
                diesel::insert_into(modversion::table)
                    .values(&record)
                    .on_conflict((modversion::modid, modversion::version))
                    .do_update()
                    .set(&record)
                    .execute(conn)?;
            }

            for version in &m.versions {
                diesel::delete(
                    moddependency::table
                        .filter(moddependency::modid.eq(version.parent_id.key()))
                        .filter(moddependency::version.eq(&version.version)),
                )
                .execute(conn)?;

                for (edge, dep) in version.dependency_records().iter().zip(&version.dependencies) {
                    diesel::replace_into(moddependency::table)
                        .values(edge)
                        .execute(conn)
                        .map_err(|e| match e {
                            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                                CatalogError::UnresolvedDependency {
                                    id: version.id(),
                                    dependency: dep.clone(),
                                }
                            }
                            other => other.into(),
                        })?;
                }
            }

            Ok(())
        })?;

        log::debug!("Saved {} with {} version(s)", m.id, m.versions.len());
        Ok(())
    }

    pub fn set_version_hash(&mut self, id: &Identifier, hash: Option<&str>) -> Result<()> {
        let version = id.version.as_deref().unwrap_or_default();
        let updated = diesel::update(
            modversion::table
                .filter(modversion::modid.eq(id.key()))
                .filter(modversion::version.eq(version)),
        )
        .set(modversion::hash.eq(hash))
        .execute(&mut self.conn)?;

        if updated == 0 {
            return Err(CatalogError::UnknownMod(id.clone()));
        }
        Ok(())
    }

    /// Replace the stored entry hashes of one version.
    pub fn replace_entry_hashes(&mut self, id: &Identifier, entries: &[(String, String)]) -> Result<()> {
        let modid = id.key();
        let version = id.version.clone().unwrap_or_default();
        let records: Vec<EntryHashRecord> = entries
            .iter()
            .map(|(entryname, hash)| EntryHashRecord {
                modid: modid.clone(),
                version: version.clone(),
                entryname: entryname.clone(),
                hash: hash.clone(),
            })
            .collect();

        self.conn.transaction::<_, CatalogError, _>(|conn| {
            diesel::delete(
                modentryhash::table
                    .filter(modentryhash::modid.eq(&modid))
                    .filter(modentryhash::version.eq(&version)),
            )
            .execute(conn)?;

            for chunk in records.chunks(500) {
                diesel::replace_into(modentryhash::table)
                    .values(chunk)
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    /// `(entry name, hash)` pairs in entry name order.
    pub fn entry_hashes(&mut self, id: &Identifier) -> Result<Vec<(String, String)>> {
        let rows = modentryhash::table
            .filter(modentryhash::modid.eq(id.key()))
            .filter(modentryhash::version.eq(id.version.clone().unwrap_or_default()))
            .order(modentryhash::entryname)
            .select((modentryhash::entryname, modentryhash::hash))
            .load::<(String, String)>(&mut self.conn)?;
        Ok(rows)
    }
}
