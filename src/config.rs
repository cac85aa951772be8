//! Agent configuration.
//!
//! Loaded from `config.toml` (see [`crate::dirs::config_file`]). Every
//! field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use geoverify_api::ApiConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Maximum wait for the reachability check before treating the device as offline.
pub const MAX_CONNECTIVITY_TIMEOUT_MS: u64 = 1000;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Verification service client settings.
    pub api: ApiConfig,
    /// Session and tick settings.
    pub tracking: TrackingSettings,
    /// Where credentials and the offline cache are kept.
    pub storage: StorageSettings,
}

/// `[tracking]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Ticks run by a single `start`/resume before the session yields.
    pub max_ticks_per_invocation: u32,
    /// Bound on the connectivity probe, in milliseconds.
    pub connectivity_timeout_ms: u64,
    /// Host probed for reachability. Defaults to the API host.
    pub probe_host: Option<String>,
    /// Port probed for reachability.
    pub probe_port: u16,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            max_ticks_per_invocation: 10,
            connectivity_timeout_ms: MAX_CONNECTIVITY_TIMEOUT_MS,
            probe_host: None,
            probe_port: 443,
        }
    }
}

impl TrackingSettings {
    /// Connectivity probe bound as a [`Duration`].
    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity_timeout_ms)
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Data directory override. Falls back to [`crate::dirs::data_dir`].
    pub data_dir: Option<PathBuf>,
}

impl StorageSettings {
    /// Effective data directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(crate::dirs::data_dir)
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AgentError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate all sections.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        if self.tracking.max_ticks_per_invocation == 0 {
            return Err(AgentError::Config(
                "tracking.max_ticks_per_invocation must be greater than 0".into(),
            ));
        }
        if !(1..=MAX_CONNECTIVITY_TIMEOUT_MS).contains(&self.tracking.connectivity_timeout_ms) {
            return Err(AgentError::Config(format!(
                "tracking.connectivity_timeout_ms must be between 1 and {MAX_CONNECTIVITY_TIMEOUT_MS}"
            )));
        }
        if self
            .tracking
            .probe_host
            .as_deref()
            .is_some_and(|h| h.trim().is_empty())
        {
            return Err(AgentError::Config(
                "tracking.probe_host must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Host and port the connectivity probe dials.
    ///
    /// Uses `tracking.probe_host` when set, otherwise the API host.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the base URL has no host.
    pub fn probe_target(&self) -> Result<(String, u16)> {
        if let Some(host) = &self.tracking.probe_host {
            return Ok((host.clone(), self.tracking.probe_port));
        }
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| AgentError::Config(format!("invalid api.base_url: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| AgentError::Config("api.base_url has no host".into()))?;
        let port = url.port_or_known_default().unwrap_or(self.tracking.probe_port);
        Ok((host.to_owned(), port))
    }
}
