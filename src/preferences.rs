//! Persisted user preferences: currently only the colour theme.
//!
//! Stored as JSON at `<config_dir>/pyq-analyzer/preferences.json`, where
//! `<config_dir>` is `$PYQ_CONFIG_DIR` if set, else the platform config
//! directory. A missing or unreadable file is not an error: defaults are
//! used and a warning is logged.

use crate::error::PyqError;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Overrides the base config directory.
pub const CONFIG_DIR_ENV: &str = "PYQ_CONFIG_DIR";

const APP_DIR: &str = "pyq-analyzer";
const FILE_NAME: &str = "preferences.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
}

/// Where preferences live on this machine, if anywhere.
pub fn preferences_path() -> Option<PathBuf> {
    let base = std::env::var_os(CONFIG_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join(APP_DIR).join(FILE_NAME))
}

impl Preferences {
    /// Load from the default location; defaults on any failure.
    pub fn load() -> Self {
        match preferences_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available; using default preferences");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Could not read {}: {}; using defaults", path.display(), e);
                return Self::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring corrupt preferences file {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Save to the default location and return the path written.
    pub fn save(&self) -> Result<PathBuf, PyqError> {
        let path = preferences_path().ok_or_else(|| PyqError::Preferences {
            path: PathBuf::from(FILE_NAME),
            detail: format!("no config directory; set {CONFIG_DIR_ENV}"),
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PyqError> {
        let err = |detail: String| PyqError::Preferences {
            path: path.to_path_buf(),
            detail,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| err(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| err(e.to_string()))?;
        debug!("Saved preferences to {}", path.display());
        Ok(())
    }

    /// Flip the theme and return the new one.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}
