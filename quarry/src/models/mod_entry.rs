use crate::error::Result;
use crate::models::ModVersion;
use crate::schema::mods;
use diesel::prelude::*;
use quarry_lib::{Identifier, Packing};
use serde::Serialize;
use std::fmt;

/// An installable mod and its versions in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mod {
    /// `root:value`, never versioned
    pub id: Identifier,
    pub name: String,
    pub source_url: Option<String>,
    pub versions: Vec<ModVersion>,
}

impl Mod {
    /// The last declared version.
    pub fn latest_version(&self) -> Option<&ModVersion> {
        self.versions.last()
    }

    pub fn version(&self, version: &str) -> Option<&ModVersion> {
        self.versions.iter().find(|v| v.version == version)
    }

    pub fn version_mut(&mut self, version: &str) -> Option<&mut ModVersion> {
        self.versions.iter_mut().find(|v| v.version == version)
    }

    /// A mod whose versions include the platform itself.
    pub fn is_base(&self) -> bool {
        self.versions.iter().any(|v| v.packing == Packing::Base)
    }

    pub fn to_record(&self) -> ModRecord {
        ModRecord {
            id: self.id.key(),
            name: self.name.clone(),
            url: self.source_url.clone(),
        }
    }

    pub fn from_record(record: ModRecord, versions: Vec<ModVersion>) -> Result<Self> {
        Ok(Self {
            id: Identifier::parse(&record.id)?,
            name: record.name,
            source_url: record.url,
            versions,
        })
    }
}

impl fmt::Display for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({})",
            self.id,
            self.name,
            self.source_url.as_deref().unwrap_or("")
        )
    }
}

/// Row of the `mod` table
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = mods)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ModRecord {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}
