use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_ASSET_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Client settings persisted between runs, including the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Host that relative avatar paths are resolved against.
    pub asset_base_url: String,
    pub token: Option<String>,
    pub poll_interval_secs: u64,
    /// Unset keeps the HTTP stack's own default.
    pub request_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_string(),
            token: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: None,
        }
    }
}

impl AppConfig {
    // TOML is the primary format. A JSON file from older builds is migrated on first load.
    pub fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("cobuild.toml"))
    }

    fn legacy_json_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("org", "cobuild", "CoBuild")?;
        Some(proj.config_dir().join("state.json"))
    }

    /// Loads from the default location, falling back to defaults when nothing
    /// usable is on disk. Environment overrides are applied last.
    pub fn load() -> Self {
        let mut config = Self::load_files().unwrap_or_default();
        config.apply_env();
        config
    }

    fn load_files() -> Option<Self> {
        if let Some(path) = Self::toml_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return Some(config),
                    Err(e) => warn!("Ignoring unreadable config {}: {}", path.display(), e),
                }
            }
        }

        let legacy = Self::legacy_json_path()?;
        if !legacy.exists() {
            return None;
        }
        match Self::load_legacy(&legacy) {
            Ok(config) => {
                info!("Migrating legacy config {}", legacy.display());
                if let Err(e) = config.save() {
                    warn!("Could not write migrated config: {}", e);
                }
                Some(config)
            }
            Err(e) => {
                warn!("Ignoring legacy config {}: {}", legacy.display(), e);
                None
            }
        }
    }

    /// Reads the JSON file written by older builds.
    pub fn load_legacy(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice::<AppConfig>(&bytes)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&text)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::toml_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("COBUILD_API_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Some(secs) = std::env::var("COBUILD_POLL_SECS").ok().and_then(|s| s.trim().parse().ok()) {
            self.poll_interval_secs = secs;
        }
    }

    /// Never zero: a zero period would make the poll timer spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
