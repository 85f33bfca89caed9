//! Player settings, persisted as `scena.json`.

use crate::config::{self, PathConfig};
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Start playback right after a successful load
    pub autoplay: bool,
    /// Fraction of the viewport the scene may occupy
    pub viewport_margin: f64,
    /// Step for float controls without a declared step
    pub float_step: f64,
    /// Render target handed to the engine on surface allocation
    pub canvas_target: String,
    /// Display refresh rate (headless pacing)
    pub display_fps: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            autoplay: true,
            viewport_margin: crate::widgets::viewport::DEFAULT_MARGIN,
            float_step: crate::widgets::ae::DEFAULT_FLOAT_STEP,
            canvas_target: "#canvas".to_string(),
            display_fps: 60.0,
            viewport_width: 1280.0,
            viewport_height: 720.0,
        }
    }
}

impl PlayerSettings {
    /// Read settings from `path`. A missing file gives defaults; a malformed
    /// one gives defaults and a warning.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&text) {
            Ok(settings) => {
                info!("Settings loaded from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Ignoring malformed settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Settings from the configured directory.
    pub fn load(paths: &PathConfig) -> Self {
        Self::load_from(&config::config_file(config::SETTINGS_FILE, paths))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn save(&self, paths: &PathConfig) -> Result<()> {
        config::ensure_dirs(paths)?;
        self.save_to(&config::config_file(config::SETTINGS_FILE, paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("scena-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = PlayerSettings::load_from(&temp_path("missing.json"));
        assert_eq!(settings, PlayerSettings::default());
        assert!(settings.autoplay);
        assert_eq!(settings.float_step, 0.01);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial.json");
        std::fs::write(&path, r#"{ "autoplay": false, "display_fps": 30.0 }"#).unwrap();
        let settings = PlayerSettings::load_from(&path);
        assert!(!settings.autoplay);
        assert_eq!(settings.display_fps, 30.0);
        assert_eq!(settings.viewport_margin, 0.9);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let path = temp_path("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(PlayerSettings::load_from(&path), PlayerSettings::default());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("saved.json");
        let settings = PlayerSettings {
            canvas_target: "#stage".into(),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(PlayerSettings::load_from(&path), settings);
        let _ = std::fs::remove_file(&path);
    }
}
