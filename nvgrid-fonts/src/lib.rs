//! Font management and cell metrics for the nvgrid renderer.
//!
//! This crate provides:
//! - Font loading with system font discovery, a fixed default family and
//!   a fallback chain for glyphs the primary font lacks
//! - The `guifont` option mini-syntax (`Family_Name:h12.5`)
//! - Cell metric computation: every grid cell is a whole number of pixels
//!   wide and high, derived from the primary font's advance and extents

pub mod error;
pub mod font_manager;
pub mod guifont;
pub mod metrics;

pub use error::FontError;
pub use font_manager::{FALLBACK_FAMILIES, FontData, FontManager, MONOSPACE_FAMILIES};
pub use guifont::GuiFont;
pub use metrics::{FontMetrics, FontRequest, RawFontMetrics};
