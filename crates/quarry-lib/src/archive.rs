use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open archive {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt archive {path:?}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to read entry {entry} of {path:?}: {source}")]
    Entry {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

/// Random access to the named entries of an artifact archive.
pub trait ArchiveReader: Send + Sync {
    /// Calls `visit` with the name and contents of every file entry.
    fn for_each_entry(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&str, &mut dyn Read) -> std::io::Result<()>,
    ) -> Result<(), ArchiveError>;
}

/// Entries holding compiled JVM code.
pub fn is_compiled_code(entry_name: &str) -> bool {
    Path::new(entry_name)
        .extension()
        .is_some_and(|ext| ext == "class")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn for_each_entry(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&str, &mut dyn Read) -> std::io::Result<()>,
    ) -> Result<(), ArchiveError> {
        let zip_error = |source| ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file).map_err(zip_error)?;
        log::debug!("Opened {:?}, {} entries", path, archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(zip_error)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_owned();
            visit(&name, &mut entry).map_err(|source| ArchiveError::Entry {
                path: path.to_path_buf(),
                entry: name.clone(),
                source,
            })?;
        }

        Ok(())
    }
}
