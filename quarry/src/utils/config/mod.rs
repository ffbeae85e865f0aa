//! # Configuration
//!
//! Settings come from the process environment, after loading a `.env` file
//! from the working directory if one exists. Command-line flags override
//! individual values in `main`.
//!
//! | Variable                   | Default                    |
//! |----------------------------|----------------------------|
//! | `QUARRY_DATA_DIR`          | `<user data dir>/Quarry`   |
//! | `QUARRY_DEBUG`             | `false`                    |
//! | `QUARRY_HTTP_TIMEOUT_SECS` | `120`                      |
//! | `QUARRY_USER_AGENT`        | `quarry/<version>`         |
//! | `QUARRY_BASE_MANIFEST`     | unset (no bootstrap import)|

use crate::utils::db_manager::{archives_dir, default_data_dir, store_path};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub debug_logging: bool,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// Manifest imported at bootstrap when no base mod is in the catalog
    pub base_manifest: Option<String>,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {:?}", path);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("QUARRY_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let debug_logging = match lookup("QUARRY_DEBUG") {
            Some(v) => parse_bool(&v)
                .with_context(|| format!("QUARRY_DEBUG must be a boolean, got {v:?}"))?,
            None => false,
        };

        let http_timeout_secs = match lookup("QUARRY_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("QUARRY_HTTP_TIMEOUT_SECS must be a number, got {v:?}"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let user_agent = lookup("QUARRY_USER_AGENT")
            .unwrap_or_else(|| format!("quarry/{}", env!("CARGO_PKG_VERSION")));

        let base_manifest = lookup("QUARRY_BASE_MANIFEST").filter(|v| !v.trim().is_empty());

        Ok(Self {
            data_dir,
            debug_logging,
            http_timeout_secs,
            user_agent,
            base_manifest,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn store_path(&self) -> PathBuf {
        store_path(&self.data_dir)
    }

    pub fn archives_dir(&self) -> PathBuf {
        archives_dir(&self.data_dir)
    }

    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        self.data_dir = data_dir.to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("QUARRY_DATA_DIR", "/tmp/quarry"),
            ("QUARRY_DEBUG", "yes"),
            ("QUARRY_HTTP_TIMEOUT_SECS", "5"),
            ("QUARRY_BASE_MANIFEST", "http://example.com/minecraft.xml"),
        ])
        .unwrap();

        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/quarry"));
        assert!(cfg.debug_logging);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.store_path(), PathBuf::from("/tmp/quarry/data.db"));
        assert_eq!(cfg.archives_dir(), PathBuf::from("/tmp/quarry/archives"));
        assert_eq!(cfg.base_manifest.as_deref(), Some("http://example.com/minecraft.xml"));
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("QUARRY_DATA_DIR", "/data")]).unwrap();
        assert!(!cfg.debug_logging);
        assert_eq!(cfg.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(cfg.user_agent.starts_with("quarry/"));
        assert_eq!(cfg.base_manifest, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("QUARRY_DATA_DIR", "/d"), ("QUARRY_DEBUG", "maybe")]).is_err());
        assert!(config(&[("QUARRY_DATA_DIR", "/d"), ("QUARRY_HTTP_TIMEOUT_SECS", "soon")]).is_err());
    }
}
