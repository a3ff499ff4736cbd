//! Configuration file loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::options::{CodexOptions, ThreadOptions};

/// `[client]` table: process-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Explicit codex binary.
    pub codex_path: Option<PathBuf>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Replaces the inherited environment when present.
    pub env: Option<HashMap<String, String>>,
    /// Seconds a cancelled process may keep running before it is signalled.
    pub termination_grace_secs: Option<u64>,
}

impl ClientConfig {
    /// Convert to client options.
    #[must_use]
    pub fn to_options(&self) -> CodexOptions {
        let mut options = CodexOptions::default();
        if let Some(path) = &self.codex_path {
            options = options.codex_path(path.clone());
        }
        if let Some(url) = &self.base_url {
            options = options.base_url(url.clone());
        }
        if let Some(key) = &self.api_key {
            options = options.api_key(key.clone());
        }
        if let Some(env) = &self.env {
            options = options.env(env.clone());
        }
        if let Some(secs) = self.termination_grace_secs {
            options = options.termination_grace(Duration::from_secs(secs));
        }
        options
    }
}

/// Configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub client: ClientConfig,
    /// Defaults for every thread.
    pub thread: ThreadOptions,
}

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(".codex-sdk.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("codex-sdk").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<SdkConfig, ConfigError> {
        match self.find_config_file() {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load_from_path(&path)
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(SdkConfig::default())
            }
        }
    }

    fn load_from_path(path: &Path) -> Result<SdkConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
