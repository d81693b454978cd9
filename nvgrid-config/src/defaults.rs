//! Default value functions for configuration.
//!
//! Each `default_*`-style free function is used as a
//! `#[serde(default = "crate::defaults::...")]` attribute on a `Config` field.

use crate::types::{LogLevel, PowerPreference, VsyncMode};

/// Family used when the requested font is not installed.
pub const FALLBACK_FONT_FAMILY: &str = "Consolas";

/// Smallest accepted point size.
pub const MIN_FONT_SIZE: f32 = 5.0;

/// Largest accepted point size.
pub const MAX_FONT_SIZE: f32 = 150.0;

pub fn font_family() -> String {
    FALLBACK_FONT_FAMILY.to_string()
}

pub fn font_size() -> f32 {
    14.0
}

pub fn linespace_factor() -> f32 {
    1.0 // Line height multiplier
}

pub fn dpi_scale() -> f32 {
    1.0
}

pub fn vsync_mode() -> VsyncMode {
    VsyncMode::Fifo
}

pub fn power_preference() -> PowerPreference {
    PowerPreference::None
}

pub fn frame_latency_timeout_ms() -> u64 {
    1000
}

pub fn title_suffix() -> String {
    "nvgrid".to_string()
}

pub fn log_level() -> LogLevel {
    LogLevel::Off
}

pub fn cols() -> usize {
    80
}

pub fn rows() -> usize {
    24
}
