//! Viewer configuration
//!
//! Settings the application shell merges with its command line: scene file,
//! render camera, window size, device selector, and the animation wrap
//! duration. Stored as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Path that failed to parse
        path: String,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },
}

/// Viewer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Scene file to load
    pub scene: Option<String>,
    /// Render camera name; the free-fly camera when unset
    pub camera: Option<String>,
    /// Window width in pixels
    pub window_width: u32,
    /// Window height in pixels
    pub window_height: u32,
    /// Physical device selector forwarded to the backend
    pub device: Option<String>,
    /// Animation wrap duration in seconds
    pub max_animation_time: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scene: None,
            camera: None,
            window_width: 800,
            window_height: 600,
            device: None,
            max_animation_time: 3.75,
        }
    }
}

impl ViewerConfig {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Aspect ratio of the configured window
    pub fn aspect(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: ViewerConfig = toml::from_str("camera = \"main\"").unwrap();
        assert_eq!(config.camera.as_deref(), Some("main"));
        assert_eq!(config.window_width, 800);
        assert!((config.max_animation_time - 3.75).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip() {
        let config = ViewerConfig {
            scene: Some("demo.s72".to_string()),
            window_width: 1280,
            ..ViewerConfig::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: ViewerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.scene.as_deref(), Some("demo.s72"));
        assert_eq!(parsed.window_width, 1280);
    }
}
