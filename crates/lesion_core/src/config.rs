//! Client configuration: defaults, optional TOML file, environment override.

use anyhow::{Context, Result};
use directories_next::ProjectDirs;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/predict";
pub const DEFAULT_FIELD_NAME: &str = "image";
/// Overrides the endpoint regardless of what the config file says.
pub const ENDPOINT_ENV: &str = "LESION_UPLOAD_ENDPOINT";
/// Points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "LESION_UPLOAD_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL the image is POSTed to.
    pub endpoint: String,
    /// Multipart field carrying the image bytes.
    pub field_name: String,
    pub timeout_secs: u64,
    /// Label rendered with the warning tone.
    pub malignant_label: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            timeout_secs: 30,
            malignant_label: "malignant".to_string(),
        }
    }
}

impl ClientConfig {
    /// Resolves the configuration from the process environment and the
    /// platform config directory.
    pub fn load() -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok();
        let path = lookup(CONFIG_PATH_ENV)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(default_config_path);
        Self::load_from(path.as_deref(), lookup)
    }

    /// Same as [`ClientConfig::load`] with an explicit file and variable source.
    /// A missing file falls back to defaults; an unreadable one is an error.
    pub fn load_from(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = match path {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            Some(path) => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        Ok(base.with_env_overrides(lookup).sanitized())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                tracing::info!("Endpoint overridden by {ENDPOINT_ENV}");
                self.endpoint = endpoint.to_string();
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.endpoint.trim().is_empty() {
            tracing::warn!("Empty endpoint in config, using {DEFAULT_ENDPOINT}");
            self.endpoint = defaults.endpoint;
        }
        if self.field_name.trim().is_empty() {
            self.field_name = defaults.field_name;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = defaults.timeout_secs;
        }
        self
    }
}

/// `config.toml` inside the per-user config directory, when one exists.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "LesionUpload").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
