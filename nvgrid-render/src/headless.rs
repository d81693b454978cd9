//! Presentation backend that records draw calls instead of rendering.
//!
//! Used by the replay tool when no window exists, and by tests that need to
//! observe exactly what the compositor asked for.

use std::time::Duration;

use nvgrid_fonts::FontRequest;

use crate::color::Rgb;
use crate::compositor::{Canvas, TextRun};
use crate::error::RenderError;
use crate::frame::{FrameWait, PresentationBackend};
use crate::layout::{CellMetrics, PixelRect, PixelSize};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect { rect: PixelRect, color: Rgb },
    Text(TextRun),
    BeginFrame,
    Present,
}

#[derive(Debug)]
pub struct HeadlessBackend {
    metrics: CellMetrics,
    ops: Vec<DrawOp>,
    device_ready: bool,
    device_generation: u64,
    surface_size: Option<PixelSize>,
    frame_wait: FrameWait,
    pending_error: Option<RenderError>,
    font_requests: Vec<FontRequest>,
    frames_begun: u64,
    presents: u64,
}

impl HeadlessBackend {
    /// A backend whose fonts always produce `metrics`.
    pub fn new(metrics: CellMetrics) -> Self {
        Self {
            metrics,
            ops: Vec::new(),
            device_ready: false,
            device_generation: 0,
            surface_size: None,
            frame_wait: FrameWait::Ready,
            pending_error: None,
            font_requests: Vec::new(),
            frames_begun: 0,
            presents: 0,
        }
    }

    /// Metrics returned by subsequent font loads.
    pub fn set_metrics(&mut self, metrics: CellMetrics) {
        self.metrics = metrics;
    }

    /// Make the next `present` fail with `error`.
    pub fn fail_next_present(&mut self, error: RenderError) {
        self.pending_error = Some(error);
    }

    pub fn set_frame_wait(&mut self, wait: FrameWait) {
        self.frame_wait = wait;
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn present_count(&self) -> u64 {
        self.presents
    }

    pub fn frames_begun(&self) -> u64 {
        self.frames_begun
    }

    /// Incremented each time device resources are created.
    pub fn device_generation(&self) -> u64 {
        self.device_generation
    }

    pub fn surface_size(&self) -> Option<PixelSize> {
        self.surface_size
    }

    pub fn font_requests(&self) -> &[FontRequest] {
        &self.font_requests
    }
}

impl Canvas for HeadlessBackend {
    fn fill_rect(&mut self, rect: PixelRect, color: Rgb) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn draw_text(&mut self, run: &TextRun) {
        self.ops.push(DrawOp::Text(run.clone()));
    }
}

impl PresentationBackend for HeadlessBackend {
    fn create_device_resources(&mut self) -> Result<(), RenderError> {
        self.device_ready = true;
        self.device_generation += 1;
        Ok(())
    }

    fn release_device_resources(&mut self) {
        self.device_ready = false;
        self.surface_size = None;
        self.ops.clear();
    }

    fn create_surface(&mut self, size: PixelSize) -> Result<(), RenderError> {
        if !self.device_ready {
            return Err(RenderError::DeviceError("no device".to_string()));
        }
        self.surface_size = Some(size);
        Ok(())
    }

    fn load_font(&mut self, request: &FontRequest) -> Result<CellMetrics, RenderError> {
        if !self.device_ready {
            return Err(RenderError::DeviceError("no device".to_string()));
        }
        self.font_requests.push(request.clone());
        Ok(self.metrics)
    }

    fn wait_for_frame(&mut self, _timeout: Duration) -> FrameWait {
        self.frame_wait
    }

    fn begin_frame(&mut self) {
        self.frames_begun += 1;
        self.ops.push(DrawOp::BeginFrame);
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if self.surface_size.is_none() {
            return Err(RenderError::NotAttached);
        }
        if let Some(error) = self.pending_error.take() {
            return Err(error);
        }
        self.presents += 1;
        self.ops.push(DrawOp::Present);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_call_order() {
        let mut backend = HeadlessBackend::new(CellMetrics::new(8.0, 16.0));
        backend.create_device_resources().unwrap();
        backend.create_surface(PixelSize::new(80, 32)).unwrap();
        backend.begin_frame();
        backend.fill_rect(PixelRect::new(0.0, 0.0, 8.0, 16.0), Rgb::BLACK);
        backend.present().unwrap();

        assert_eq!(
            backend.take_ops(),
            vec![
                DrawOp::BeginFrame,
                DrawOp::FillRect {
                    rect: PixelRect::new(0.0, 0.0, 8.0, 16.0),
                    color: Rgb::BLACK,
                },
                DrawOp::Present,
            ]
        );
        assert!(backend.ops().is_empty());
    }

    #[test]
    fn surface_requires_device() {
        let mut backend = HeadlessBackend::new(CellMetrics::new(8.0, 16.0));
        assert!(backend.create_surface(PixelSize::new(10, 10)).is_err());
        backend.create_device_resources().unwrap();
        backend.release_device_resources();
        assert!(backend.surface_size().is_none());
        assert!(matches!(
            backend.present(),
            Err(RenderError::NotAttached)
        ));
    }
}
