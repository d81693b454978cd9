//! Grid model, line compositor and GPU presentation for the nvgrid renderer.
//!
//! This crate provides:
//!
//! - The character grid, highlight table and cursor model the editor's
//!   redraw events update
//! - A compositor that turns grid rows into background fills and styled
//!   text runs on a [`Canvas`]
//! - A frame manager that brackets drawing, paces frames and recovers from
//!   surface loss, over a wgpu backend or a recording headless one

pub mod color;
pub mod compositor;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod grid;
pub mod headless;
pub mod highlight;
pub mod layout;

pub use color::Rgb;
pub use compositor::{Canvas, PlacedGlyph, TextRun, TextStyle};
pub use cursor::{Cursor, CursorShape, MAX_CURSOR_MODE_INFOS, ModeInfo};
pub use error::{ProtocolError, RenderError};
pub use frame::{FrameManager, FrameState, FrameWait, PresentOutcome, PresentationBackend};
pub use gpu::{GpuBackend, GpuSettings, SurfaceSource};
pub use grid::{Cell, Grid, ScrollRegion, WIDE_CONTINUATION};
pub use headless::{DrawOp, HeadlessBackend};
pub use highlight::{
    DefaultColors, HighlightAttributes, HighlightFlags, HighlightTable, HighlightUpdate,
    MAX_HIGHLIGHT_ATTRIBS,
};
pub use layout::{CellMetrics, PixelRect, PixelSize};
