//! Glyph rasterization and the atlas texture glyphs are packed into.

use std::collections::HashMap;

use swash::FontRef;
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;

use super::pipeline;

/// Pixel padding around each glyph to prevent bilinear bleed.
const ATLAS_GLYPH_PADDING: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GlyphKey {
    pub font_index: usize,
    pub glyph_id: u16,
}

/// Where a glyph lives in the atlas and how it sits relative to the pen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AtlasGlyph {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub is_colored: bool,
}

pub(crate) enum AtlasLookup {
    Hit(AtlasGlyph),
    /// The glyph has no ink (space, control) and needs no quad.
    Empty,
    /// No room left; flush pending draws, clear, and retry.
    Full,
}

pub(crate) struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub pixels: Vec<u8>,
    pub is_colored: bool,
}

/// Row-based packer: glyphs fill a shelf left to right, then a new shelf
/// starts below the tallest glyph of the current one.
#[derive(Debug, Clone)]
pub(crate) struct ShelfPacker {
    size: u32,
    next_x: u32,
    next_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            next_x: 0,
            next_y: 0,
            row_height: 0,
        }
    }

    pub fn allocate(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width + ATLAS_GLYPH_PADDING > self.size {
            return None;
        }
        if self.next_x + width + ATLAS_GLYPH_PADDING > self.size {
            self.next_x = 0;
            self.next_y += self.row_height + ATLAS_GLYPH_PADDING;
            self.row_height = 0;
        }
        if self.next_y + height + ATLAS_GLYPH_PADDING > self.size {
            return None;
        }
        let origin = (self.next_x, self.next_y);
        self.next_x += width + ATLAS_GLYPH_PADDING;
        self.row_height = self.row_height.max(height);
        Some(origin)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.size);
    }
}

pub(crate) struct GlyphAtlas {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    size: u32,
    packer: ShelfPacker,
    glyphs: HashMap<GlyphKey, Option<AtlasGlyph>>,
    scale_context: ScaleContext,
}

impl GlyphAtlas {
    pub fn new(device: &wgpu::Device) -> Self {
        let (texture, view, sampler, size) = pipeline::create_atlas(device);
        Self {
            texture,
            view,
            sampler,
            size,
            packer: ShelfPacker::new(size),
            glyphs: HashMap::new(),
            scale_context: ScaleContext::new(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Forget every packed glyph. Texels are left in place and overwritten
    /// as new glyphs arrive.
    pub fn clear(&mut self) {
        self.glyphs.clear();
        self.packer.reset();
    }

    /// Look a glyph up, rasterizing and uploading it on a miss.
    pub fn lookup(
        &mut self,
        queue: &wgpu::Queue,
        font: FontRef<'_>,
        key: GlyphKey,
        size_px: f32,
    ) -> AtlasLookup {
        if let Some(cached) = self.glyphs.get(&key) {
            return match cached {
                Some(glyph) => AtlasLookup::Hit(*glyph),
                None => AtlasLookup::Empty,
            };
        }

        let Some(raster) = rasterize(&mut self.scale_context, font, size_px, key.glyph_id) else {
            self.glyphs.insert(key, None);
            return AtlasLookup::Empty;
        };
        if raster.width == 0 || raster.height == 0 {
            self.glyphs.insert(key, None);
            return AtlasLookup::Empty;
        }

        let Some((x, y)) = self.packer.allocate(raster.width, raster.height) else {
            if self.glyphs.is_empty() {
                log::warn!(
                    "glyph {} ({}x{}) does not fit an empty {}px atlas, skipping",
                    key.glyph_id,
                    raster.width,
                    raster.height,
                    self.size
                );
                self.glyphs.insert(key, None);
                return AtlasLookup::Empty;
            }
            return AtlasLookup::Full;
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            &raster.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * raster.width),
                rows_per_image: Some(raster.height),
            },
            wgpu::Extent3d {
                width: raster.width,
                height: raster.height,
                depth_or_array_layers: 1,
            },
        );

        let glyph = AtlasGlyph {
            x,
            y,
            width: raster.width,
            height: raster.height,
            bearing_x: raster.bearing_x,
            bearing_y: raster.bearing_y,
            is_colored: raster.is_colored,
        };
        self.glyphs.insert(key, Some(glyph));
        AtlasLookup::Hit(glyph)
    }
}

/// Rasterize one glyph to RGBA. Color sources are tried first so emoji
/// fonts come out as color bitmaps; outline fonts fall through to an
/// alpha mask stored as white with coverage in alpha.
pub(crate) fn rasterize(
    context: &mut ScaleContext,
    font: FontRef<'_>,
    size_px: f32,
    glyph_id: u16,
) -> Option<RasterizedGlyph> {
    let mut scaler = context.builder(font).size(size_px).hint(true).build();

    let image = Render::new(&[
        Source::ColorBitmap(StrikeWith::BestFit),
        Source::ColorOutline(0),
        Source::Outline,
    ])
    .format(Format::Alpha)
    .render(&mut scaler, glyph_id)?;

    let (pixels, is_colored) = match image.content {
        Content::Color => (image.data.clone(), true),
        Content::Mask => (mask_to_rgba(&image.data), false),
        Content::SubpixelMask => (
            image
                .data
                .chunks_exact(4)
                .flat_map(|px| [255, 255, 255, luminance(px[0], px[1], px[2])])
                .collect(),
            false,
        ),
    };

    Some(RasterizedGlyph {
        width: image.placement.width,
        height: image.placement.height,
        bearing_x: image.placement.left as f32,
        bearing_y: image.placement.top as f32,
        pixels,
        is_colored,
    })
}

fn mask_to_rgba(mask: &[u8]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(mask.len() * 4);
    for &alpha in mask {
        pixels.extend_from_slice(&[255, 255, 255, alpha]);
    }
    pixels
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}
