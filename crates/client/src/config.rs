// Local configuration for the Coiisy client.
//
// Config file: `~/.coiisy/config.toml`

use coiisy_common::types::SessionIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_LOG_FILTER: &str = "info";

/// Root directory for Coiisy local state: `~/.coiisy/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".coiisy"))
}

/// Path to the config file: `~/.coiisy/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Client configuration at `~/.coiisy/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Display name announced when joining sessions.
    pub display_name: Option<String>,
    /// Stable user id for this device.
    pub user_id: Option<String>,
    /// Where session snapshots are kept (defaults to `~/.coiisy`).
    pub storage_dir: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            user_id: None,
            storage_dir: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

impl ClientConfig {
    /// Load from `~/.coiisy/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Resolved snapshot directory, if one can be determined.
    pub fn storage_root(&self) -> Option<PathBuf> {
        self.storage_dir.clone().or_else(global_dir)
    }

    /// The configured identity, when both id and name are set.
    pub fn identity(&self) -> Option<SessionIdentity> {
        match (&self.user_id, &self.display_name) {
            (Some(user_id), Some(name)) if !user_id.is_empty() => {
                Some(SessionIdentity::new(user_id.clone(), name.clone()))
            }
            _ => None,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
