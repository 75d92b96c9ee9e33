// src/settings.rs - Persisted application settings
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::stability::StabilityConfig;

/// Per-user settings file, if the platform has a config directory.
pub static SETTINGS_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| {
    directories::ProjectDirs::from("com", "jewelrytryon", "JewelryTryOn")
        .map(|dirs| dirs.config_dir().join("settings.json"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub stability: StabilityConfig,
    pub camera_index: u32,
    pub mirror: bool,
    pub assets_dir: PathBuf,
    pub output_directory: PathBuf,
    pub log_capacity: usize,
    /// Recorded landmark stream used instead of the simulated face.
    pub replay_file: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            stability: StabilityConfig::default(),
            camera_index: 0,
            mirror: true,
            assets_dir: PathBuf::from("assets"),
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.picture_dir().map(|p| p.join("JewelryTryOn")))
                .unwrap_or_else(|| PathBuf::from("./output")),
            log_capacity: 10_000,
            replay_file: None,
        }
    }
}

impl AppSettings {
    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Loads from the per-user settings file, falling back to defaults on
    /// any error.
    pub fn load_or_default() -> Self {
        let Some(path) = SETTINGS_PATH.as_ref() else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), "ignoring unreadable settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn save_default_location(&self) -> Result<Option<PathBuf>> {
        match SETTINGS_PATH.as_ref() {
            Some(path) => {
                self.save(path)?;
                Ok(Some(path.clone()))
            }
            None => Ok(None),
        }
    }
}
