//! Vertex and instance layouts shared with the WGSL shaders.
//!
//! Instance positions and sizes are in normalized device coordinates,
//! computed on the CPU from pixel rectangles; heights are negative because
//! pixel y grows downward.

use bytemuck::{Pod, Zeroable};

use crate::layout::{PixelRect, PixelSize};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// A solid rectangle.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct RectInstance {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

/// A textured glyph quad sampled from the atlas.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct GlyphInstance {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub tex_offset: [f32; 2],
    pub tex_size: [f32; 2],
    pub color: [f32; 4],
    /// Non-zero for color bitmaps, which ignore `color`.
    pub is_colored: u32,
}

/// Maps pixel rectangles into clip space for one target size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NdcTransform {
    width: f32,
    height: f32,
}

impl NdcTransform {
    pub fn new(size: PixelSize) -> Self {
        Self {
            width: size.width.max(1) as f32,
            height: size.height.max(1) as f32,
        }
    }

    /// `(position, size)` of `rect` in clip space.
    pub fn rect(&self, rect: &PixelRect) -> ([f32; 2], [f32; 2]) {
        (
            [
                rect.left / self.width * 2.0 - 1.0,
                1.0 - rect.top / self.height * 2.0,
            ],
            [
                rect.width() / self.width * 2.0,
                -(rect.height() / self.height * 2.0),
            ],
        )
    }
}
