//! Filesystem locations used by the agent.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/geoverify/` | `~/.local/share/geoverify/` |
//! | Config | `~/Library/Application Support/geoverify/` | `~/.config/geoverify/` |
//!
//! Override with `GEOVERIFY_DATA_DIR` and `GEOVERIFY_CONFIG_DIR`.

use std::path::{Path, PathBuf};

/// Data root holding credentials and the offline cache.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("GEOVERIFY_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    ::dirs::data_dir()
        .map(|d| d.join("geoverify"))
        .unwrap_or_else(|| PathBuf::from("/tmp/geoverify-data"))
}

/// Config directory holding `config.toml`.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("GEOVERIFY_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    ::dirs::config_dir()
        .map(|d| d.join("geoverify"))
        .unwrap_or_else(|| PathBuf::from("/tmp/geoverify-config"))
}

/// Default config file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Stored credentials file inside `data_root`.
#[must_use]
pub fn credentials_file(data_root: &Path) -> PathBuf {
    data_root.join("credentials.json")
}

/// Offline geotag cache file inside `data_root`.
#[must_use]
pub fn cache_file(data_root: &Path) -> PathBuf {
    data_root.join("geotag_cache.json")
}
