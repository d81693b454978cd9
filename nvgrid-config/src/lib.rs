//! Configuration system for the nvgrid renderer.
//!
//! This crate provides configuration loading, saving, and default values
//! for the grid renderer:
//!
//! - Font family, size, line spacing and display scale
//! - Presentation settings (vsync mode, GPU power preference, frame pacing)
//! - Window title suffix and logging level

pub mod config;
pub mod defaults;
pub mod error;
mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{LogLevel, PowerPreference, VsyncMode};
