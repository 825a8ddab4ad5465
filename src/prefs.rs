//! User preferences
//!
//! One JSON record in the platform config directory holding the saved
//! effect profile. Absence of the file, or of any individual key inside it,
//! falls back to built-in defaults so older records keep loading after new
//! parameters are added.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::effects::EffectProfile;

/// Application preferences (stored in config directory)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppPreferences {
    /// Saved effect profile. `None` means the user never saved one.
    #[serde(rename = "profile", default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<EffectProfile>,

    /// Device index selected when the profile was last saved.
    #[serde(rename = "cameraIndex", default)]
    pub camera_index: usize,
}

impl AppPreferences {
    /// Preferences file path under the platform config directory.
    fn prefs_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("snowcam");
            p.push("preferences.json");
            p
        })
    }

    /// Load preferences from the config directory. Any failure (no config
    /// dir, missing file, unreadable JSON) yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::prefs_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load preferences from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save preferences to the config directory.
    pub fn save(&self) -> Result<(), PrefsError> {
        let Some(path) = Self::prefs_path() else {
            return Err(PrefsError::NoConfigDir);
        };
        self.save_to(&path)
    }

    /// Save preferences to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), PrefsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(PrefsError::Io)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(PrefsError::Json)?;
        fs::write(path, json).map_err(PrefsError::Io)?;
        Ok(())
    }
}

/// Preferences-related errors
#[derive(Debug)]
pub enum PrefsError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NoConfigDir,
}

impl std::fmt::Display for PrefsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefsError::Io(e) => write!(f, "IO error: {}", e),
            PrefsError::Json(e) => write!(f, "JSON error: {}", e),
            PrefsError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for PrefsError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("snowcam-prefs-test-{}-{}", std::process::id(), name));
        path.push("preferences.json");
        path
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("roundtrip");
        let prefs = AppPreferences {
            profile: Some(EffectProfile {
                intensity: 0.8,
                flicker_rate: 2.0,
                entoptic_enabled: true,
                ..EffectProfile::default()
            }),
            camera_index: 1,
        };
        prefs.save_to(&path).unwrap();

        let loaded = AppPreferences::load_from(&path);
        assert_eq!(loaded.profile, prefs.profile);
        assert_eq!(loaded.camera_index, 1);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_path("missing");
        let loaded = AppPreferences::load_from(&path);
        assert!(loaded.profile.is_none());
        assert_eq!(loaded.camera_index, 0);
    }

    #[test]
    fn corrupt_record_yields_defaults() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json {").unwrap();

        let loaded = AppPreferences::load_from(&path);
        assert!(loaded.profile.is_none());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
