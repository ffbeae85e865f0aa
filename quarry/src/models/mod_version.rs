use crate::error::{CatalogError, Result};
use crate::schema::{moddependency, modentryhash, modversion};
use diesel::prelude::*;
use quarry_lib::{Identifier, Packing};
use serde::Serialize;
use std::fmt;

/// One downloadable release of a mod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModVersion {
    pub parent_id: Identifier,
    pub version: String,
    pub artifact_url: String,
    #[serde(serialize_with = "serialize_packing")]
    pub packing: Packing,
    /// Lowercase hex, recorded from the manifest or the first download
    pub declared_hash: Option<String>,
    pub file_name: String,
    /// Versioned identifiers, in declaration order
    pub dependencies: Vec<Identifier>,
}

fn serialize_packing<S: serde::Serializer>(packing: &Packing, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(packing.as_str())
}

impl ModVersion {
    pub fn id(&self) -> Identifier {
        self.parent_id.with_version(self.version.clone())
    }

    pub fn to_record(&self) -> ModVersionRecord {
        ModVersionRecord {
            modid: self.parent_id.key(),
            version: self.version.clone(),
            url: self.artifact_url.clone(),
            packing: self.packing.as_str().to_string(),
            hash: self.declared_hash.clone(),
            filename: self.file_name.clone(),
        }
    }

    pub fn dependency_records(&self) -> Vec<DependencyRecord> {
        self.dependencies
            .iter()
            .map(|dep| DependencyRecord {
                modid: self.parent_id.key(),
                version: self.version.clone(),
                depmodid: dep.key(),
                depversion: dep.version.clone().unwrap_or_default(),
            })
            .collect()
    }

    pub fn from_records(record: ModVersionRecord, edges: Vec<DependencyRecord>) -> Result<Self> {
        let packing = record
            .packing
            .parse::<Packing>()
            .map_err(|_| CatalogError::CorruptRow {
                column: "modversion.packing",
                value: record.packing.clone(),
            })?;

        let dependencies = edges
            .into_iter()
            .map(|edge| -> Result<Identifier> {
                let dep = Identifier::parse(&edge.depmodid)?;
                Ok(dep.with_version(edge.depversion))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            parent_id: Identifier::parse(&record.modid)?,
            version: record.version,
            artifact_url: record.url,
            packing,
            declared_hash: record.hash,
            file_name: record.filename,
            dependencies,
        })
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.version, self.artifact_url)
    }
}

/// Row of the `modversion` table
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = modversion)]
#[diesel(primary_key(modid, version))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ModVersionRecord {
    pub modid: String,
    pub version: String,
    pub url: String,
    pub packing: String,
    pub hash: Option<String>,
    pub filename: String,
}

/// Row of the `moddependency` table
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = moddependency)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DependencyRecord {
    pub modid: String,
    pub version: String,
    pub depmodid: String,
    pub depversion: String,
}

/// Row of the `modentryhash` table
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = modentryhash)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntryHashRecord {
    pub modid: String,
    pub version: String,
    pub entryname: String,
    pub hash: String,
}
