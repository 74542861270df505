//! Configuration file resolution
//!
//! Locates the Candor TOML configuration file following the priority
//! order: explicit path (CLI/env, handled by the caller), then the
//! user config directory, then the system-wide location.

use std::path::PathBuf;

/// Locate the configuration file, if one exists.
///
/// Checks `~/.config/candor/config.toml` (platform equivalent via
/// `dirs`) first, then `/etc/candor/config.toml` on unix. Returns
/// `None` when neither exists; the service then runs on compiled
/// defaults.
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("candor").join("config.toml")) {
        if user_config.exists() {
            tracing::debug!(path = %user_config.display(), "Using user configuration file");
            return Some(user_config);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/candor/config.toml");
        if system_config.exists() {
            tracing::debug!(path = %system_config.display(), "Using system configuration file");
            return Some(system_config);
        }
    }

    tracing::debug!("No configuration file found; using compiled defaults");
    None
}

/// Read an optional string table entry from a parsed TOML value
pub fn toml_str(value: &toml::Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Read an optional integer table entry from a parsed TOML value
pub fn toml_int(value: &toml::Value, key: &str) -> Option<i64> {
    value.get(key).and_then(|v| v.as_integer())
}
