//! Typed error types for nvgrid-render.
//!
//! Two families live here. [`ProtocolError`] covers update events that break
//! a grid, highlight or cursor invariant; the dispatcher decides whether
//! those are fatal. [`RenderError`] covers graphics failures, of which only
//! surface/device loss has a defined recovery.

use thiserror::Error;

/// An update event referenced state that does not exist or asked for
/// something the model does not support.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("grid dimensions must be positive, got {cols}x{rows}")]
    EmptyGrid { cols: usize, rows: usize },

    #[error("row {row} outside grid of {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("column {col} outside grid of {cols} columns")]
    ColumnOutOfBounds { col: usize, cols: usize },

    #[error("scroll region rows [{top}, {bottom}) cols [{left}, {right}) invalid for {rows}x{cols} grid")]
    ScrollRegion {
        top: usize,
        bottom: usize,
        left: usize,
        right: usize,
        rows: usize,
        cols: usize,
    },

    /// The protocol never scrolls horizontally.
    #[error("horizontal scroll by {0} columns is not supported")]
    HorizontalScroll(i64),

    #[error("highlight id {id} exceeds table capacity {capacity}")]
    HighlightId { id: u64, capacity: usize },

    #[error("{len} cursor modes exceed capacity {capacity}")]
    TooManyModes { len: usize, capacity: usize },

    #[error("cursor mode {index} not defined ({len} modes known)")]
    UnknownMode { index: usize, len: usize },
}

/// Top-level error type for the presentation layer.
#[derive(Debug, Error)]
pub enum RenderError {
    // -----------------------------------------------------------------------
    // GPU initialisation
    // -----------------------------------------------------------------------
    /// A suitable wgpu GPU adapter could not be found for the given surface.
    #[error("GPU adapter not found: no compatible GPU adapter available for this surface")]
    AdapterNotFound,

    /// The wgpu device could not be created.
    #[error("GPU device error: {0}")]
    DeviceError(String),

    /// The device was lost after creation; all GPU objects are invalid.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// The wgpu surface could not be created or configured for the window.
    #[error("GPU surface creation failed: {0}")]
    SurfaceCreation(String),

    /// A draw or present was attempted before `attach`.
    #[error("no presentation surface attached")]
    NotAttached,

    // -----------------------------------------------------------------------
    // Surface / presentation
    // -----------------------------------------------------------------------
    /// `Surface::get_current_texture()` failed (timeout, outdated, lost, ...).
    #[error("GPU surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    // -----------------------------------------------------------------------
    // Fonts
    // -----------------------------------------------------------------------
    #[error("font error: {0}")]
    Font(#[from] nvgrid_fonts::FontError),

    /// Async runtime for blocking GPU requests could not be started.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl RenderError {
    /// Whether this error invalidates the device or surface and requires a
    /// full teardown and recreation.
    pub fn is_surface_loss(&self) -> bool {
        matches!(
            self,
            RenderError::DeviceLost(_) | RenderError::Surface(wgpu::SurfaceError::Lost)
        )
    }
}

// ---------------------------------------------------------------------------
// Convenience conversions from common upstream error types
// ---------------------------------------------------------------------------

impl From<wgpu::CreateSurfaceError> for RenderError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        RenderError::SurfaceCreation(e.to_string())
    }
}

impl From<wgpu::RequestDeviceError> for RenderError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        RenderError::DeviceError(e.to_string())
    }
}
