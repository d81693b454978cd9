//! wgpu presentation backend.
//!
//! Draw calls are batched into rectangle and glyph instances, kept in call
//! order as segments, and rendered into a retained canvas texture that
//! persists across frames. Present flushes the batch and blits the canvas
//! onto the swap-chain texture, so rows that did not change never need
//! redrawing.

mod atlas;
mod brush;
pub(crate) mod pipeline;
pub(crate) mod types;

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use nvgrid_config::{Config, PowerPreference, VsyncMode};
use nvgrid_fonts::{FontManager, FontRequest};

use crate::color::Rgb;
use crate::compositor::{Canvas, TextRun};
use crate::error::RenderError;
use crate::frame::{FrameWait, PresentationBackend};
use crate::layout::{CellMetrics, PixelRect, PixelSize};
use atlas::{AtlasGlyph, AtlasLookup, GlyphAtlas, GlyphKey};
use brush::BrushCache;
use types::{GlyphInstance, NdcTransform, RectInstance};

/// Creates the platform surface for a window. Called again after device
/// loss, since a surface cannot outlive its instance.
pub type SurfaceSource = Box<
    dyn Fn(&wgpu::Instance) -> Result<wgpu::Surface<'static>, wgpu::CreateSurfaceError> + Send,
>;

/// Initial instance-buffer capacity; grows by powers of two.
const INITIAL_INSTANCE_CAPACITY: usize = 4096;

/// Interval between device polls while waiting for a frame slot.
const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Color the canvas starts out with before anything is drawn.
const CANVAS_CLEAR: wgpu::Color = wgpu::Color::BLACK;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuSettings {
    pub vsync_mode: VsyncMode,
    pub power_preference: PowerPreference,
    /// Frames allowed in flight before `wait_for_frame` blocks.
    pub max_frame_latency: u32,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            vsync_mode: VsyncMode::default(),
            power_preference: PowerPreference::default(),
            max_frame_latency: 1,
        }
    }
}

impl GpuSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            vsync_mode: config.vsync_mode,
            power_preference: config.power_preference,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Rects(Range<u32>),
    Glyphs(Range<u32>),
}

/// Everything tied to the device; rebuilt after device loss.
struct DeviceResources {
    surface: Option<wgpu::Surface<'static>>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    rect_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,
    blit_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    text_bind_group: wgpu::BindGroup,
    canvas_sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
    rect_buffer: wgpu::Buffer,
    rect_capacity: usize,
    glyph_buffer: wgpu::Buffer,
    glyph_capacity: usize,
    atlas: GlyphAtlas,
    brushes: BrushCache,
    lost: Arc<AtomicBool>,
}

/// The swap surface configuration and retained canvas for one size.
struct TargetResources {
    config: Option<wgpu::SurfaceConfiguration>,
    canvas_view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
    size: PixelSize,
    /// Canvas has never been rendered to and must be cleared first.
    fresh: bool,
}

pub struct GpuBackend {
    runtime: tokio::runtime::Runtime,
    surface_source: Option<SurfaceSource>,
    settings: GpuSettings,
    device: Option<DeviceResources>,
    target: Option<TargetResources>,
    fonts: Option<FontManager>,
    metrics: Option<CellMetrics>,
    rects: Vec<RectInstance>,
    glyphs: Vec<GlyphInstance>,
    segments: Vec<Segment>,
    frame_done: Arc<AtomicBool>,
}

impl GpuBackend {
    /// Create a backend. With no surface source, frames are rendered to
    /// the offscreen canvas only.
    pub fn new(
        surface_source: Option<SurfaceSource>,
        settings: GpuSettings,
    ) -> Result<Self, RenderError> {
        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        Ok(Self {
            runtime,
            surface_source,
            settings,
            device: None,
            target: None,
            fonts: None,
            metrics: None,
            rects: Vec::new(),
            glyphs: Vec::new(),
            segments: Vec::new(),
            frame_done: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn is_offscreen(&self) -> bool {
        self.surface_source.is_none()
    }

    /// Surface format in use, once device resources exist.
    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.device.as_ref().map(|dev| dev.format)
    }

    pub fn adapter_info(&self) -> Option<wgpu::AdapterInfo> {
        self.device.as_ref().map(|dev| dev.adapter.get_info())
    }

    fn create_instance() -> wgpu::Instance {
        // Windows: DX12 (Vulkan may not work in VMs)
        // macOS: Metal
        // Linux: Vulkan, with GL as a fallback for VMs
        #[cfg(target_os = "windows")]
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::DX12,
            ..Default::default()
        });
        #[cfg(target_os = "macos")]
        let instance = wgpu::Instance::default();
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN | wgpu::Backends::GL,
            ..Default::default()
        });
        instance
    }

    fn push_rect(&mut self, instance: RectInstance) {
        let index = self.rects.len() as u32;
        self.rects.push(instance);
        match self.segments.last_mut() {
            Some(Segment::Rects(range)) if range.end == index => range.end += 1,
            _ => self.segments.push(Segment::Rects(index..index + 1)),
        }
    }

    fn push_glyph(&mut self, instance: GlyphInstance) {
        let index = self.glyphs.len() as u32;
        self.glyphs.push(instance);
        match self.segments.last_mut() {
            Some(Segment::Glyphs(range)) if range.end == index => range.end += 1,
            _ => self.segments.push(Segment::Glyphs(index..index + 1)),
        }
    }

    fn clear_batch(&mut self) {
        self.rects.clear();
        self.glyphs.clear();
        self.segments.clear();
    }

    /// Queue a solid rectangle, clipped to `clip`.
    fn queue_rect(&mut self, rect: PixelRect, clip: Option<&PixelRect>, color: Rgb) {
        let rect = match clip {
            Some(clip) => rect.intersect(clip),
            None => rect,
        };
        if rect.is_empty() {
            return;
        }
        let (Some(dev), Some(target)) = (self.device.as_mut(), self.target.as_ref()) else {
            return;
        };
        let (position, size) = NdcTransform::new(target.size).rect(&rect);
        let color = dev.brushes.get(color);
        self.push_rect(RectInstance {
            position,
            size,
            color,
        });
    }

    /// Find a glyph in the atlas, making room by flushing and clearing it
    /// when it is full.
    fn atlas_glyph(&mut self, key: GlyphKey) -> Option<AtlasGlyph> {
        let size_px = self.metrics.map(|m| m.font_size_px)?;
        for _ in 0..2 {
            let lookup = {
                let (Some(dev), Some(fonts)) = (self.device.as_mut(), self.fonts.as_ref()) else {
                    return None;
                };
                let font = fonts.get_font(key.font_index)?;
                dev.atlas.lookup(&dev.queue, font, key, size_px)
            };
            match lookup {
                AtlasLookup::Hit(glyph) => return Some(glyph),
                AtlasLookup::Empty => return None,
                AtlasLookup::Full => {
                    log::debug!("glyph atlas full, flushing and starting over");
                    self.flush();
                    if let Some(dev) = self.device.as_mut() {
                        dev.atlas.clear();
                    }
                }
            }
        }
        None
    }

    /// Render the queued batch into the canvas.
    fn flush(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        if self.device.is_none() || self.target.is_none() {
            self.clear_batch();
            return;
        }
        let (Some(dev), Some(target)) = (self.device.as_mut(), self.target.as_mut()) else {
            return;
        };

        if self.rects.len() > dev.rect_capacity {
            dev.rect_capacity = self.rects.len().next_power_of_two();
            dev.rect_buffer = pipeline::create_instance_buffer::<RectInstance>(
                &dev.device,
                "rect instance buffer",
                dev.rect_capacity,
            );
        }
        if self.glyphs.len() > dev.glyph_capacity {
            dev.glyph_capacity = self.glyphs.len().next_power_of_two();
            dev.glyph_buffer = pipeline::create_instance_buffer::<GlyphInstance>(
                &dev.device,
                "glyph instance buffer",
                dev.glyph_capacity,
            );
        }
        if !self.rects.is_empty() {
            dev.queue
                .write_buffer(&dev.rect_buffer, 0, bytemuck::cast_slice(&self.rects));
        }
        if !self.glyphs.is_empty() {
            dev.queue
                .write_buffer(&dev.glyph_buffer, 0, bytemuck::cast_slice(&self.glyphs));
        }

        let load = if target.fresh {
            wgpu::LoadOp::Clear(CANVAS_CLEAR)
        } else {
            wgpu::LoadOp::Load
        };
        target.fresh = false;

        let mut encoder = dev
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("canvas encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("canvas pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.canvas_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_vertex_buffer(0, dev.vertex_buffer.slice(..));

            for segment in &self.segments {
                match segment {
                    Segment::Rects(range) => {
                        pass.set_pipeline(&dev.rect_pipeline);
                        pass.set_vertex_buffer(1, dev.rect_buffer.slice(..));
                        pass.draw(0..4, range.clone());
                    }
                    Segment::Glyphs(range) => {
                        pass.set_pipeline(&dev.text_pipeline);
                        pass.set_bind_group(0, &dev.text_bind_group, &[]);
                        pass.set_vertex_buffer(1, dev.glyph_buffer.slice(..));
                        pass.draw(0..4, range.clone());
                    }
                }
            }
        }
        dev.queue.submit(std::iter::once(encoder.finish()));
        self.clear_batch();
    }

    fn arm_frame_signal(&self, queue: &wgpu::Queue) {
        self.frame_done.store(false, Ordering::Release);
        let done = Arc::clone(&self.frame_done);
        queue.on_submitted_work_done(move || done.store(true, Ordering::Release));
    }
}

impl Canvas for GpuBackend {
    fn fill_rect(&mut self, rect: PixelRect, color: Rgb) {
        self.queue_rect(rect, None, color);
    }

    fn draw_text(&mut self, run: &TextRun) {
        let Some(metrics) = self.metrics else {
            return;
        };
        let clip = run.clip;
        let style = run.style;
        let atlas_size = match self.device.as_ref() {
            Some(dev) => dev.atlas.size() as f32,
            None => return,
        };

        for placed in &run.glyphs {
            let key = match self
                .fonts
                .as_ref()
                .and_then(|fonts| fonts.find_glyph(placed.ch, style.bold, style.italic))
            {
                Some((font_index, glyph_id)) => GlyphKey {
                    font_index,
                    glyph_id,
                },
                // Primary font's .notdef
                None => GlyphKey {
                    font_index: 0,
                    glyph_id: 0,
                },
            };
            let Some(glyph) = self.atlas_glyph(key) else {
                continue;
            };

            let left = placed.x + glyph.bearing_x;
            let top = run.baseline - glyph.bearing_y;
            let quad = PixelRect::new(
                left,
                top,
                left + glyph.width as f32,
                top + glyph.height as f32,
            );
            let visible = quad.intersect(&clip);
            if visible.is_empty() {
                continue;
            }
            let (Some(dev), Some(target)) = (self.device.as_mut(), self.target.as_ref()) else {
                return;
            };
            let (position, size) = NdcTransform::new(target.size).rect(&visible);
            let color = dev.brushes.get(style.foreground);
            self.push_glyph(GlyphInstance {
                position,
                size,
                tex_offset: [
                    (glyph.x as f32 + visible.left - quad.left) / atlas_size,
                    (glyph.y as f32 + visible.top - quad.top) / atlas_size,
                ],
                tex_size: [visible.width() / atlas_size, visible.height() / atlas_size],
                color,
                is_colored: glyph.is_colored as u32,
            });
        }

        let thickness = metrics.underline_thickness;
        if style.underline {
            let top = run.rect.top + metrics.underline_position;
            let line = PixelRect::new(run.rect.left, top, run.rect.right, top + thickness);
            self.queue_rect(line, Some(&clip), style.special);
        }
        if style.strikethrough {
            let top = run.rect.top + metrics.strikeout_position - (thickness / 2.0).floor();
            let line = PixelRect::new(run.rect.left, top, run.rect.right, top + thickness);
            self.queue_rect(line, Some(&clip), style.foreground);
        }
    }
}

impl PresentationBackend for GpuBackend {
    fn create_device_resources(&mut self) -> Result<(), RenderError> {
        let instance = Self::create_instance();
        let surface = match &self.surface_source {
            Some(source) => Some(source(&instance)?),
            None => None,
        };

        let adapter = self
            .runtime
            .block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.settings.power_preference.to_wgpu(),
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            }))
            .map_err(|_| RenderError::AdapterNotFound)?;

        let (device, queue) = self
            .runtime
            .block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            }))?;

        let lost = Arc::new(AtomicBool::new(false));
        {
            let lost = Arc::clone(&lost);
            device.set_device_lost_callback(move |reason, message| {
                if reason != wgpu::DeviceLostReason::Destroyed {
                    log::error!("GPU device lost ({reason:?}): {message}");
                    lost.store(true, Ordering::Release);
                }
            });
        }

        let format = match &surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                caps.formats
                    .iter()
                    .copied()
                    .find(|f| !f.is_srgb())
                    .or_else(|| caps.formats.first().copied())
                    .ok_or_else(|| {
                        RenderError::SurfaceCreation("surface reports no formats".to_string())
                    })?
            }
            None => pipeline::OFFSCREEN_FORMAT,
        };

        let info = adapter.get_info();
        log::info!(
            "GPU device ready: {} ({:?}), format {:?}",
            info.name,
            info.backend,
            format
        );

        let texture_layout =
            pipeline::create_texture_bind_group_layout(&device, "texture bind group layout");
        let atlas = GlyphAtlas::new(&device);
        let text_bind_group = pipeline::create_texture_bind_group(
            &device,
            &texture_layout,
            &atlas.view,
            &atlas.sampler,
            "text bind group",
        );

        self.device = Some(DeviceResources {
            rect_pipeline: pipeline::create_rect_pipeline(&device, format),
            text_pipeline: pipeline::create_text_pipeline(&device, format, &texture_layout),
            blit_pipeline: pipeline::create_blit_pipeline(&device, format, &texture_layout),
            canvas_sampler: pipeline::create_canvas_sampler(&device),
            vertex_buffer: pipeline::create_vertex_buffer(&device),
            rect_buffer: pipeline::create_instance_buffer::<RectInstance>(
                &device,
                "rect instance buffer",
                INITIAL_INSTANCE_CAPACITY,
            ),
            rect_capacity: INITIAL_INSTANCE_CAPACITY,
            glyph_buffer: pipeline::create_instance_buffer::<GlyphInstance>(
                &device,
                "glyph instance buffer",
                INITIAL_INSTANCE_CAPACITY,
            ),
            glyph_capacity: INITIAL_INSTANCE_CAPACITY,
            brushes: BrushCache::new(format),
            text_bind_group,
            texture_layout,
            atlas,
            surface,
            adapter,
            device,
            queue,
            format,
            lost,
        });
        self.frame_done.store(true, Ordering::Release);
        Ok(())
    }

    fn release_device_resources(&mut self) {
        self.clear_batch();
        self.target = None;
        self.fonts = None;
        if let Some(dev) = self.device.take() {
            log::debug!(
                "Releasing GPU resources ({} cached brushes)",
                dev.brushes.len()
            );
        }
    }

    fn create_surface(&mut self, size: PixelSize) -> Result<(), RenderError> {
        let Some(dev) = self.device.as_ref() else {
            return Err(RenderError::NotAttached);
        };
        let width = size.width.max(1);
        let height = size.height.max(1);

        let config = match &dev.surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&dev.adapter);

                let requested = self.settings.vsync_mode.to_present_mode();
                let present_mode = if caps.present_modes.contains(&requested) {
                    requested
                } else {
                    log::warn!(
                        "Requested present mode {:?} not supported (available: {:?}), falling back",
                        requested,
                        caps.present_modes
                    );
                    if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
                        wgpu::PresentMode::Fifo
                    } else {
                        caps.present_modes
                            .first()
                            .copied()
                            .unwrap_or(wgpu::PresentMode::Fifo)
                    }
                };

                // PreMultiplied > PostMultiplied > Auto > first available
                let alpha_mode = [
                    wgpu::CompositeAlphaMode::PreMultiplied,
                    wgpu::CompositeAlphaMode::PostMultiplied,
                    wgpu::CompositeAlphaMode::Auto,
                ]
                .into_iter()
                .find(|mode| caps.alpha_modes.contains(mode))
                .or_else(|| caps.alpha_modes.first().copied())
                .unwrap_or(wgpu::CompositeAlphaMode::Auto);

                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format: dev.format,
                    width,
                    height,
                    present_mode,
                    alpha_mode,
                    view_formats: vec![],
                    desired_maximum_frame_latency: self.settings.max_frame_latency.max(1),
                };
                surface.configure(&dev.device, &config);
                log::info!(
                    "Surface configured: {}x{} {:?} {:?}",
                    width,
                    height,
                    present_mode,
                    alpha_mode
                );
                Some(config)
            }
            None => None,
        };

        let canvas = pipeline::create_canvas(&dev.device, dev.format, width, height);
        let canvas_view = canvas.create_view(&wgpu::TextureViewDescriptor::default());
        let blit_bind_group = pipeline::create_texture_bind_group(
            &dev.device,
            &dev.texture_layout,
            &canvas_view,
            &dev.canvas_sampler,
            "blit bind group",
        );

        // Draws queued against the old size would land in the wrong place.
        self.clear_batch();
        self.target = Some(TargetResources {
            config,
            canvas_view,
            blit_bind_group,
            size: PixelSize::new(width, height),
            fresh: true,
        });
        Ok(())
    }

    fn load_font(&mut self, request: &FontRequest) -> Result<CellMetrics, RenderError> {
        let fonts = match self.fonts.take() {
            Some(mut fonts) => {
                if fonts.family() != request.family {
                    fonts.set_family(&request.family)?;
                }
                fonts
            }
            None => FontManager::new(&request.family)?,
        };
        let font_metrics = fonts.metrics(request)?;
        let metrics = CellMetrics::from_font(&font_metrics, request.dpi_scale);
        log::info!(
            "Loaded font '{}' ({}pt): cell {}x{} px, glyphs at {:.2}px",
            fonts.family(),
            request.clamped_point_size(),
            metrics.cell_width,
            metrics.cell_height,
            metrics.font_size_px
        );

        // Glyphs from the old font or size must not be reused.
        self.flush();
        if let Some(dev) = self.device.as_mut() {
            dev.atlas.clear();
        }
        self.fonts = Some(fonts);
        self.metrics = Some(metrics);
        Ok(metrics)
    }

    fn wait_for_frame(&mut self, timeout: Duration) -> FrameWait {
        let Some(dev) = self.device.as_ref() else {
            return FrameWait::Ready;
        };
        let deadline = Instant::now() + timeout;
        while !self.frame_done.load(Ordering::Acquire) {
            if dev.lost.load(Ordering::Acquire) {
                return FrameWait::Ready;
            }
            if Instant::now() >= deadline {
                return FrameWait::TimedOut;
            }
            let _ = dev.device.poll(wgpu::PollType::Poll);
            std::thread::sleep(FRAME_POLL_INTERVAL);
        }
        FrameWait::Ready
    }

    fn begin_frame(&mut self) {
        log::trace!("begin frame ({} queued segments)", self.segments.len());
    }

    fn present(&mut self) -> Result<(), RenderError> {
        match self.device.as_ref() {
            None => return Err(RenderError::NotAttached),
            Some(dev) if dev.lost.load(Ordering::Acquire) => {
                return Err(RenderError::DeviceLost(
                    "device reported lost since the last frame".to_string(),
                ));
            }
            Some(_) => {}
        }
        if self.target.is_none() {
            return Err(RenderError::NotAttached);
        }

        self.flush();

        let (Some(dev), Some(target)) = (self.device.as_ref(), self.target.as_ref()) else {
            return Err(RenderError::NotAttached);
        };
        let (Some(surface), Some(config)) = (dev.surface.as_ref(), target.config.as_ref()) else {
            self.arm_frame_signal(&dev.queue);
            return Ok(());
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated) => {
                log::debug!("surface outdated, reconfiguring");
                surface.configure(&dev.device, config);
                surface.get_current_texture()?
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring the next surface texture, dropping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = dev
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("present encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CANVAS_CLEAR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&dev.blit_pipeline);
            pass.set_bind_group(0, &target.blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        dev.queue.submit(std::iter::once(encoder.finish()));
        self.arm_frame_signal(&dev.queue);
        frame.present();
        Ok(())
    }
}
