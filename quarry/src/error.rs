use quarry_lib::archive::ArchiveError;
use quarry_lib::net::TransportError;
use quarry_lib::{Identifier, ManifestError, ParseIdError};
use std::path::PathBuf;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog store at {path:?} is unavailable: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open catalog store: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("schema migration {version} failed: {source}")]
    Migration {
        version: i32,
        #[source]
        source: diesel::result::Error,
    },

    /// The store could not be brought up even after recreating it.
    #[error("catalog store at {path:?} could not be migrated after recovery: {source}")]
    SchemaMigrationFailed {
        path: PathBuf,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Format(#[from] ParseIdError),

    #[error("stored value {value:?} in {column} is invalid")]
    CorruptRow { column: &'static str, value: String },

    #[error("{0} is not in the catalog")]
    UnknownMod(Identifier),

    #[error("{id} depends on {dependency}, which is not in the catalog")]
    UnresolvedDependency { id: Identifier, dependency: Identifier },

    #[error("{0} has not been downloaded")]
    NotDownloaded(Identifier),

    #[error("downloaded {id} hashes to {actual}, expected {expected}")]
    HashMismatch {
        id: Identifier,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> CatalogError {
        let path = path.into();
        move |source| CatalogError::Io { path, source }
    }
}
