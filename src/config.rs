use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const ENV_FIGURL_BASE_URL: &str = "FIGURL_BASE_URL";
pub const ENV_IPFS_GATEWAY: &str = "IPFS_GATEWAY";
pub const ENV_STORE_DIR: &str = "MULTITRIAL_RASTER_STORE";
pub const ENV_CACHE_DIR: &str = "MULTITRIAL_RASTER_CACHE";

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Endpoints and directories used by the loaders and the figure service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Viewer base, e.g. `https://figurl.org`.
    pub figurl_base_url: String,
    /// HTTP gateway that serves `/ipfs/<cid>`.
    pub ipfs_gateway: String,
    /// Root of the local content store for figure payloads.
    pub store_dir: PathBuf,
    /// Where fetched IPFS blobs are cached, if anywhere.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default();
        Self {
            figurl_base_url: crate::figure::figurl::DEFAULT_BASE_URL.to_string(),
            ipfs_gateway: "https://ipfs.io".to_string(),
            store_dir: home.join(".multitrial-raster").join("store"),
            cache_dir: None,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// A JSON file (any subset of the fields) overlaid with the environment.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Replace fields whose variable `lookup` returns non-empty.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_FIGURL_BASE_URL) {
            self.figurl_base_url = v;
        }
        if let Some(v) = get(ENV_IPFS_GATEWAY) {
            self.ipfs_gateway = v;
        }
        if let Some(v) = get(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(v));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_point_at_public_services() {
        let config = Config::default();
        assert_eq!(config.figurl_base_url, "https://figurl.org");
        assert_eq!(config.ipfs_gateway, "https://ipfs.io");
        assert!(config.store_dir.ends_with(".multitrial-raster/store"));
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn overrides_skip_empty_values() {
        let env: HashMap<&str, &str> = [
            (ENV_IPFS_GATEWAY, "http://localhost:8080"),
            (ENV_FIGURL_BASE_URL, "  "),
            (ENV_CACHE_DIR, "/tmp/ipfs-cache"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ipfs_gateway, "http://localhost:8080");
        assert_eq!(config.figurl_base_url, "https://figurl.org");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/ipfs-cache")));
    }

    #[test]
    fn json_file_fills_missing_fields_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"store_dir": "/data/figures"}"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        // The environment may override; only check the untouched default path.
        if std::env::var(ENV_STORE_DIR).is_err() {
            assert_eq!(config.store_dir, PathBuf::from("/data/figures"));
        }
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::from_json_file(&path), Err(Error::Config(_))));
    }
}
