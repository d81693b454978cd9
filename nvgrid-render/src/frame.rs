//! Frame pacing and presentation-surface lifecycle.
//!
//! ```text
//! Detached --attach--> Attached --begin_draw--> Drawing
//!                         ^                        |
//!                         +--end_draw_and_present--+
//! ```
//!
//! Drawing calls go straight to the backend's [`Canvas`]; the manager only
//! brackets them. A present that reports surface or device loss tears the
//! backend down and rebuilds it before returning, and tells the caller to
//! repaint everything.

use std::time::Duration;

use nvgrid_fonts::FontRequest;

use crate::compositor::Canvas;
use crate::error::RenderError;
use crate::layout::{CellMetrics, PixelSize};

/// Result of waiting for the presentation engine to accept another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameWait {
    Ready,
    TimedOut,
}

/// What happened at the end of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// No frame was open, so nothing was submitted.
    Skipped,
    /// The backend failed in a way that only loses this frame.
    Dropped,
    /// Resources were rebuilt; the retained image is gone and the whole
    /// grid must be drawn again.
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Detached,
    Attached,
    Drawing,
}

/// A presentation target the frame manager drives.
///
/// Device resources (device, pipelines, glyph and color caches, fonts)
/// outlive surface resources (swap surface and retained target image);
/// `create_surface` must not touch the former.
pub trait PresentationBackend: Canvas {
    fn create_device_resources(&mut self) -> Result<(), RenderError>;

    /// Drop every device and surface resource, including caches.
    fn release_device_resources(&mut self);

    /// Create or recreate the swap surface and retained target for `size`.
    fn create_surface(&mut self, size: PixelSize) -> Result<(), RenderError>;

    /// Resolve and load a font, returning the resulting cell metrics.
    fn load_font(&mut self, request: &FontRequest) -> Result<CellMetrics, RenderError>;

    /// Block until fewer than the allowed number of frames are in flight,
    /// or `timeout` elapses.
    fn wait_for_frame(&mut self, timeout: Duration) -> FrameWait;

    fn begin_frame(&mut self);

    /// Submit everything drawn since the last present and show it.
    fn present(&mut self) -> Result<(), RenderError>;
}

/// Owns the backend and the draw bracket around it.
pub struct FrameManager<B: PresentationBackend> {
    backend: B,
    state: FrameState,
    size: PixelSize,
    font: FontRequest,
    metrics: CellMetrics,
    frame_timeout: Duration,
    presents: u64,
    recoveries: u64,
}

impl<B: PresentationBackend> FrameManager<B> {
    /// Create device resources and load the initial font.
    pub fn new(
        mut backend: B,
        font: FontRequest,
        frame_timeout: Duration,
    ) -> Result<Self, RenderError> {
        backend.create_device_resources()?;
        let metrics = backend.load_font(&font)?;
        log::info!(
            "Frame manager ready: cell {}x{} px for '{}' {}pt",
            metrics.cell_width,
            metrics.cell_height,
            font.family,
            font.point_size
        );
        Ok(Self {
            backend,
            state: FrameState::Detached,
            size: PixelSize::default(),
            font,
            metrics,
            frame_timeout,
            presents: 0,
            recoveries: 0,
        })
    }

    /// Create the surface once the window size is known.
    pub fn attach(&mut self, size: PixelSize) -> Result<(), RenderError> {
        self.backend.create_surface(size)?;
        self.size = size;
        if self.state == FrameState::Detached {
            self.state = FrameState::Attached;
        }
        Ok(())
    }

    /// Recreate the surface and its target for a new size. Device objects
    /// are kept. A frame that is open is abandoned.
    pub fn resize(&mut self, size: PixelSize) -> Result<(), RenderError> {
        if self.state == FrameState::Drawing {
            log::debug!("resize during an open frame, abandoning it");
            self.state = FrameState::Attached;
        }
        self.attach(size)
    }

    /// Start a frame. Does nothing if one is already open or no surface is
    /// attached. Returns whether a new frame was started.
    pub fn begin_draw(&mut self) -> bool {
        match self.state {
            FrameState::Drawing => false,
            FrameState::Detached => {
                log::debug!("begin_draw before attach, ignoring");
                false
            }
            FrameState::Attached => {
                if self.backend.wait_for_frame(self.frame_timeout) == FrameWait::TimedOut {
                    log::debug!(
                        "frame pacing wait timed out after {:?}, drawing anyway",
                        self.frame_timeout
                    );
                }
                self.backend.begin_frame();
                self.state = FrameState::Drawing;
                true
            }
        }
    }

    /// Close the open frame and present it.
    ///
    /// Surface or device loss is recovered here, synchronously; the error
    /// is only returned if rebuilding fails.
    pub fn end_draw_and_present(&mut self) -> Result<PresentOutcome, RenderError> {
        if self.state != FrameState::Drawing {
            return Ok(PresentOutcome::Skipped);
        }
        self.state = FrameState::Attached;

        match self.backend.present() {
            Ok(()) => {
                self.presents += 1;
                Ok(PresentOutcome::Presented)
            }
            Err(e) if e.is_surface_loss() => {
                log::warn!("Presentation surface lost ({e}), recreating all resources");
                self.recover()?;
                Ok(PresentOutcome::Recovered)
            }
            Err(e) => {
                log::error!("Present failed: {e}");
                Ok(PresentOutcome::Dropped)
            }
        }
    }

    /// Load a different font and return the new cell metrics.
    pub fn set_font(&mut self, font: FontRequest) -> Result<CellMetrics, RenderError> {
        let metrics = self.backend.load_font(&font)?;
        self.font = font;
        self.metrics = metrics;
        Ok(metrics)
    }

    fn recover(&mut self) -> Result<(), RenderError> {
        self.state = FrameState::Detached;
        self.backend.release_device_resources();
        self.backend.create_device_resources()?;
        self.metrics = self.backend.load_font(&self.font)?;
        if self.size != PixelSize::default() {
            self.attach(self.size)?;
        }
        self.recoveries += 1;
        log::info!("Presentation resources recreated (recovery #{})", self.recoveries);
        Ok(())
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn draw_active(&self) -> bool {
        self.state == FrameState::Drawing
    }

    pub fn size(&self) -> PixelSize {
        self.size
    }

    pub fn metrics(&self) -> &CellMetrics {
        &self.metrics
    }

    pub fn font(&self) -> &FontRequest {
        &self.font
    }

    pub fn present_count(&self) -> u64 {
        self.presents
    }

    pub fn recovery_count(&self) -> u64 {
        self.recoveries
    }

    /// The drawing target. Draws outside an open frame are kept by the
    /// backend and shown with the next present.
    pub fn canvas(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
