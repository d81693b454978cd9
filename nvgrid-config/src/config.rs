//! The `Config` struct and its YAML persistence.
//!
//! Covers:
//! - `load` / `load_from` (YAML file I/O, defaults written on first run)
//! - `save` / `save_to` (atomic write through a temp file)
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - `validate`, which clamps or rejects out-of-range values

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{self, MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::error::ConfigError;
use crate::types::{LogLevel, PowerPreference, VsyncMode};

/// User configuration for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Font family requested at startup (`guifont` can change it later).
    #[serde(default = "defaults::font_family")]
    pub font_family: String,

    /// Font size in points.
    #[serde(default = "defaults::font_size")]
    pub font_size: f32,

    /// Line height multiplier applied to the font's natural line height.
    #[serde(default = "defaults::linespace_factor")]
    pub linespace_factor: f32,

    /// Display scale factor (1.0 for 96 DPI).
    #[serde(default = "defaults::dpi_scale")]
    pub dpi_scale: f32,

    #[serde(default = "defaults::vsync_mode")]
    pub vsync_mode: VsyncMode,

    #[serde(default = "defaults::power_preference")]
    pub power_preference: PowerPreference,

    /// Upper bound on the frame-pacing wait in `begin_draw`, in milliseconds.
    #[serde(default = "defaults::frame_latency_timeout_ms")]
    pub frame_latency_timeout_ms: u64,

    /// Appended to the editor's title text when composing the window title.
    #[serde(default = "defaults::title_suffix")]
    pub title_suffix: String,

    #[serde(default = "defaults::log_level")]
    pub log_level: LogLevel,

    /// Initial grid width hint.
    #[serde(default = "defaults::cols")]
    pub cols: usize,

    /// Initial grid height hint.
    #[serde(default = "defaults::rows")]
    pub rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_family: defaults::font_family(),
            font_size: defaults::font_size(),
            linespace_factor: defaults::linespace_factor(),
            dpi_scale: defaults::dpi_scale(),
            vsync_mode: defaults::vsync_mode(),
            power_preference: defaults::power_preference(),
            frame_latency_timeout_ms: defaults::frame_latency_timeout_ms(),
            title_suffix: defaults::title_suffix(),
            log_level: defaults::log_level(),
            cols: defaults::cols(),
            rows: defaults::rows(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_dimensions(mut self, cols: usize, rows: usize) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Bounded wait used by the frame manager before starting a frame.
    pub fn frame_latency_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_latency_timeout_ms)
    }

    /// Load configuration from the default path, creating it if missing.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            log::info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            if let Err(e) = config.save() {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path)?;
        let mut config: Config = serde_yaml_ng::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Clamp the font size into the supported range and reject values that
    /// cannot produce a usable grid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if !self.font_size.is_finite() {
            return Err(ConfigError::Validation(format!(
                "font_size must be a finite number, got {}",
                self.font_size
            )));
        }
        let clamped = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if clamped != self.font_size {
            log::warn!(
                "font_size {} outside [{}, {}], using {}",
                self.font_size,
                MIN_FONT_SIZE,
                MAX_FONT_SIZE,
                clamped
            );
            self.font_size = clamped;
        }
        if !(self.linespace_factor > 0.0 && self.linespace_factor.is_finite()) {
            return Err(ConfigError::Validation(format!(
                "linespace_factor must be positive, got {}",
                self.linespace_factor
            )));
        }
        if !(self.dpi_scale > 0.0 && self.dpi_scale.is_finite()) {
            return Err(ConfigError::Validation(format!(
                "dpi_scale must be positive, got {}",
                self.dpi_scale
            )));
        }
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::Validation(format!(
                "grid size must be positive, got {}x{}",
                self.cols, self.rows
            )));
        }
        Ok(())
    }

    /// Get the configuration file path: `~/.config/nvgrid/config.yaml`
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("nvgrid")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("nvgrid")
            } else {
                PathBuf::from(".")
            }
        }
    }
}
