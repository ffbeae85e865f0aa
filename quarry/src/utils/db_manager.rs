//! Application data locations.

use anyhow::Result;
use directories::BaseDirs;
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "Quarry";
pub const STORE_FILE_NAME: &str = "data.db";
pub const ARCHIVES_DIR_NAME: &str = "archives";

/// Default data directory (`~/.local/share/Quarry`, `%APPDATA%\Quarry`, ...)
pub fn default_data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Failed to determine user's data directory"))?;

    Ok(base_dirs.data_dir().join(APP_DIR_NAME))
}

pub fn store_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STORE_FILE_NAME)
}

pub fn archives_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(ARCHIVES_DIR_NAME)
}
