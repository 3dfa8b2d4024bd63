//! Engine settings.
//!
//! Settings are plain JSON so they can live next to project files or in the
//! user configuration directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CutlistError, Result};
use crate::time::FrameRate;

/// Tunables shared by every track of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Producer services that get a per-track duplicate when used with audio.
    /// Matching is by substring, so `avformat` also covers `avformat-novalidate`.
    pub duplicate_services: Vec<String>,
    /// Decimal separator used when a speed is written into an identifier.
    pub decimal_separator: char,
    /// Frame rate for new timelines.
    pub default_frame_rate: FrameRate,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            duplicate_services: vec!["avformat".into(), "consumer".into(), "xml".into()],
            decimal_separator: '.',
            default_frame_rate: FrameRate::FPS_25,
        }
    }
}

impl TrackSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| CutlistError::Serialization(format!("Invalid settings: {}", e)))
    }

    /// Serialize settings to pretty JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| CutlistError::Serialization(format!("Failed to write settings: {}", e)))
    }

    /// Load settings from a file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let settings = Self::from_json(&data)?;
        info!(path = %path.display(), "Loaded track settings");
        Ok(settings)
    }

    /// Save settings to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Default location: `<config dir>/cutlist/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cutlist").join("settings.json"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load_default() -> Result<Self> {
        Self::load_or_default(Self::default_path().as_deref())
    }

    /// Load from `path` when it exists, else use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => {
                debug!("No settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Whether producers of `service` need a per-track duplicate.
    pub fn needs_duplicate(&self, service: &str) -> bool {
        self.duplicate_services
            .iter()
            .any(|s| service.contains(s.as_str()))
    }
}
