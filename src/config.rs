//! Configuration file handling for live-posterizer.
//!
//! Loads configuration from `~/.config/live-posterizer/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::camera::Resolution;
use crate::canvas::{load_step_image, CanvasError};
use crate::settings::{ControlEvent, ProcessingSettings};

/// Template written by `config init`.
pub const DEFAULT_CONFIG_TOML: &str = r##"# live-posterizer configuration

[camera]
# Camera device index (see list-cameras)
device = 0
# Mirror horizontally (selfie mode)
mirror = true
# Capture resolution: low, medium, high, ultra or WIDTHxHEIGHT
resolution = "medium"

[posterize]
# Number of brightness levels (2 or more)
steps = 4
# Block edge length in source pixels
pixel_size = 8
# 1.0 is neutral, 0.0 flattens everything to mid-gray
contrast = 1.0

[effects]
# Frames processed per second
target_fps = 30
# Percent chance per block per frame of a random step (0-100)
color_flash = 0

[palette]
# One color per step, darkest first. Omit to use the gray ramp.
# colors = ["#000000", "#555555", "#aaaaaa", "#ffffff"]
# Start with random vivid colors
randomize = false

# Paint a step with an image instead of a color
# [[palette.images]]
# step = 2
# path = "/path/to/tile.png"
"##;

/// Configuration file structure for live-posterizer.
/// Loaded from ~/.config/live-posterizer/config.toml (or custom path via --config).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub posterize: PosterizeConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default)]
    pub device: u32,
    #[serde(default = "default_true")]
    pub mirror: bool,
    #[serde(default = "default_resolution")]
    pub resolution: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            mirror: true,
            resolution: default_resolution(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PosterizeConfig {
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
}

impl Default for PosterizeConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            pixel_size: default_pixel_size(),
            contrast: default_contrast(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EffectsConfig {
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    #[serde(default)]
    pub color_flash: u8,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            color_flash: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct PaletteConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(default)]
    pub randomize: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<StepImageConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StepImageConfig {
    pub step: usize,
    pub path: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_resolution() -> String {
    "medium".to_string()
}

fn default_steps() -> usize {
    4
}

fn default_pixel_size() -> u32 {
    8
}

fn default_contrast() -> f32 {
    1.0
}

fn default_target_fps() -> u32 {
    30
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Processing settings with out-of-range values clamped.
    pub fn processing_settings(&self) -> ProcessingSettings {
        ProcessingSettings::default()
            .with_steps(self.posterize.steps)
            .with_pixel_size(self.posterize.pixel_size)
            .with_contrast(self.posterize.contrast)
            .with_target_fps(self.effects.target_fps)
            .with_color_flash(self.effects.color_flash)
    }

    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        self.camera
            .resolution
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                field: "camera.resolution",
                value: self.camera.resolution.clone(),
            })
    }

    /// Render as TOML, for `config show`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

impl PaletteConfig {
    /// Control events that set up the configured palette.
    ///
    /// Randomization comes first so explicit colors and images win. Step
    /// images are decoded here; a missing or unreadable file is an error.
    pub fn events(&self) -> Result<Vec<ControlEvent>, ConfigError> {
        let mut events = Vec::new();
        if self.randomize {
            events.push(ControlEvent::RandomizeSteps);
        }
        for (index, hex) in self.colors.iter().enumerate() {
            events.push(ControlEvent::SetStepColor {
                index,
                hex: hex.clone(),
            });
        }
        for entry in &self.images {
            let image = load_step_image(&entry.path).map_err(ConfigError::Image)?;
            events.push(ControlEvent::SetStepImage {
                index: entry.step,
                image,
            });
        }
        Ok(events)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[source] toml::ser::Error),
    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },
    #[error("Failed to load palette image: {0}")]
    Image(#[source] CanvasError),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("live-posterizer").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/live-posterizer/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load(Some(Path::new("/no/such/live-posterizer.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.camera.mirror);
        assert_eq!(config.posterize.steps, 4);
        assert_eq!(config.effects.target_fps, 30);
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let file = write_config(DEFAULT_CONFIG_TOML);
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let file = write_config("[posterize]\nsteps = 6\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.posterize.steps, 6);
        assert_eq!(config.posterize.pixel_size, 8);
        assert_eq!(config.camera.resolution, "medium");
    }

    #[test]
    fn test_malformed_file_names_path() {
        let file = write_config("[posterize\nsteps = ");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_processing_settings_are_clamped() {
        let file = write_config("[posterize]\nsteps = 1\npixel_size = 0\n[effects]\ntarget_fps = 0\n");
        let settings = Config::load(Some(file.path())).unwrap().processing_settings();
        assert_eq!(settings.steps(), 2);
        assert_eq!(settings.pixel_size(), 1);
        assert_eq!(settings.target_fps(), 1);
    }

    #[test]
    fn test_resolution_preset_and_custom() {
        let mut config = Config::default();
        assert_eq!(config.resolution().unwrap(), Resolution::MEDIUM);

        config.camera.resolution = "800x600".to_string();
        assert_eq!(config.resolution().unwrap(), Resolution::new(800, 600));

        config.camera.resolution = "huge".to_string();
        assert!(matches!(
            config.resolution(),
            Err(ConfigError::InvalidValue { field: "camera.resolution", .. })
        ));
    }

    #[test]
    fn test_palette_events_order() {
        let file = write_config("[palette]\ncolors = [\"#ff0000\", \"#00ff00\"]\nrandomize = true\n");
        let config = Config::load(Some(file.path())).unwrap();
        let events = config.palette.events().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ControlEvent::RandomizeSteps));
        assert!(matches!(
            &events[2],
            ControlEvent::SetStepColor { index: 1, hex } if hex == "#00ff00"
        ));
    }

    #[test]
    fn test_palette_missing_image_is_error() {
        let file = write_config("[[palette.images]]\nstep = 1\npath = \"/no/such/tile.png\"\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(config.palette.events(), Err(ConfigError::Image(_))));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = Config::default();
        config.palette.colors = vec!["#123456".to_string(), "#abcdef".to_string()];
        let text = config.to_toml().unwrap();
        let file = write_config(&text);
        assert_eq!(Config::load(Some(file.path())).unwrap(), config);
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        let path = default_path();
        assert!(path.ends_with("live-posterizer/config.toml"));
    }
}
