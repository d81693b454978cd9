//! Cell metrics derived from a font's tables.
//!
//! The grid is laid out in whole-pixel cells: the width comes from the
//! advance of a reference glyph at the requested size, the height from the
//! rounded-up ascent and descent (each carrying half the line gap) times the
//! line spacing factor. The rasterisation size is then adjusted so that the
//! reference advance is exactly one cell wide.

use nvgrid_config::Config;
use nvgrid_config::defaults::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use swash::FontRef;

/// Glyph whose advance defines the cell width.
const REFERENCE_CHAR: char = 'A';

/// Points to pixels at 96 DPI.
const POINTS_TO_PIXELS: f32 = 96.0 / 72.0;

/// What the renderer asks the font layer for.
#[derive(Debug, Clone, PartialEq)]
pub struct FontRequest {
    pub family: String,
    /// Size in points, clamped to the supported range before use.
    pub point_size: f32,
    /// Display scale factor (1.0 for 96 DPI).
    pub dpi_scale: f32,
    /// Line height multiplier.
    pub linespace_factor: f32,
}

impl FontRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            family: config.font_family.clone(),
            point_size: config.font_size,
            dpi_scale: config.dpi_scale,
            linespace_factor: config.linespace_factor,
        }
    }

    /// Point size after clamping to the supported range.
    pub fn clamped_point_size(&self) -> f32 {
        self.point_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }
}

/// Unscaled values read from a font, in font design units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFontMetrics {
    pub units_per_em: f32,
    /// Distance from baseline to the top of the tallest glyph (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of the lowest glyph (positive).
    pub descent: f32,
    pub line_gap: f32,
    /// Advance width of the reference glyph.
    pub reference_advance: f32,
    /// Underline top relative to the baseline (negative is below).
    pub underline_offset: f32,
    pub stroke_size: f32,
    /// Strikeout top relative to the baseline (positive is above).
    pub strikeout_offset: f32,
}

impl RawFontMetrics {
    /// Read the metrics from a font. Returns `None` when the font has no
    /// em square or lacks the reference glyph.
    pub fn from_font(font: FontRef<'_>) -> Option<Self> {
        let metrics = font.metrics(&[]);
        if metrics.units_per_em == 0 {
            return None;
        }
        let glyph_id = font.charmap().map(REFERENCE_CHAR);
        if glyph_id == 0 {
            return None;
        }
        let reference_advance = font.glyph_metrics(&[]).advance_width(glyph_id);
        if reference_advance <= 0.0 {
            return None;
        }
        Some(Self {
            units_per_em: metrics.units_per_em as f32,
            ascent: metrics.ascent.abs(),
            descent: metrics.descent.abs(),
            line_gap: metrics.leading.max(0.0),
            reference_advance,
            underline_offset: metrics.underline_offset,
            stroke_size: metrics.stroke_size,
            strikeout_offset: metrics.strikeout_offset,
        })
    }
}

/// Pixel metrics for laying out the grid, all relative to a cell's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Size glyphs are rasterised at, in pixels per em.
    pub font_size_px: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Baseline offset from the cell top.
    pub ascent: f32,
    pub descent: f32,
    /// Top of the underline stroke, from the cell top.
    pub underline_position: f32,
    pub underline_thickness: f32,
    /// Top of the strikeout stroke, from the cell top.
    pub strikeout_position: f32,
}

impl FontMetrics {
    pub fn compute(raw: &RawFontMetrics, request: &FontRequest) -> Self {
        let point_size = request.clamped_point_size();
        let dpi_scale = if request.dpi_scale > 0.0 {
            request.dpi_scale
        } else {
            1.0
        };
        let linespace = if request.linespace_factor > 0.0 {
            request.linespace_factor
        } else {
            1.0
        };

        let desired_px = point_size * dpi_scale * POINTS_TO_PIXELS;
        let advance_em = raw.reference_advance / raw.units_per_em;
        let cell_width = (desired_px * advance_em).round().max(1.0);
        let font_size_px = if advance_em > 0.0 {
            cell_width / advance_em
        } else {
            desired_px
        };

        let scale = font_size_px / raw.units_per_em;
        let half_gap = raw.line_gap * scale / 2.0;
        let ascent = (raw.ascent * scale + half_gap).ceil();
        let descent = (raw.descent * scale + half_gap).ceil();
        let cell_height = ((ascent + descent) * linespace).round().max(1.0);

        let underline_thickness = (raw.stroke_size * scale).round().max(1.0);
        let underline_position = (ascent - raw.underline_offset * scale)
            .round()
            .clamp(0.0, (cell_height - underline_thickness).max(0.0));

        let strikeout_above_baseline = if raw.strikeout_offset > 0.0 {
            raw.strikeout_offset * scale
        } else {
            ascent * 0.35
        };
        let strikeout_position = (ascent - strikeout_above_baseline).round().max(0.0);

        Self {
            font_size_px,
            cell_width,
            cell_height,
            ascent,
            descent,
            underline_position,
            underline_thickness,
            strikeout_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_raw() -> RawFontMetrics {
        // Proportions of a typical monospace face (1000 upem, 600 advance).
        RawFontMetrics {
            units_per_em: 1000.0,
            ascent: 800.0,
            descent: 200.0,
            line_gap: 0.0,
            reference_advance: 600.0,
            underline_offset: -100.0,
            stroke_size: 50.0,
            strikeout_offset: 250.0,
        }
    }

    fn request(point_size: f32) -> FontRequest {
        FontRequest {
            family: "Test Mono".to_string(),
            point_size,
            dpi_scale: 1.0,
            linespace_factor: 1.0,
        }
    }

    #[test]
    fn cell_width_rounds_reference_advance() {
        // 12pt at 96 DPI = 16px; 16 * 0.6 = 9.6 -> 10
        let metrics = FontMetrics::compute(&mono_raw(), &request(12.0));
        assert_eq!(metrics.cell_width, 10.0);
        // Raster size is stretched so one advance is exactly one cell.
        assert!((metrics.font_size_px - 10.0 / 0.6).abs() < 1e-4);
    }

    #[test]
    fn cell_height_is_whole_pixels() {
        let metrics = FontMetrics::compute(&mono_raw(), &request(12.0));
        // font_size_px = 16.666..; ascent = ceil(13.33) = 14, descent = ceil(3.33) = 4
        assert_eq!(metrics.ascent, 14.0);
        assert_eq!(metrics.descent, 4.0);
        assert_eq!(metrics.cell_height, 18.0);
    }

    #[test]
    fn linespace_factor_scales_height_only() {
        let mut req = request(12.0);
        req.linespace_factor = 1.5;
        let metrics = FontMetrics::compute(&mono_raw(), &req);
        assert_eq!(metrics.cell_height, 27.0);
        assert_eq!(metrics.cell_width, 10.0);
    }

    #[test]
    fn point_size_is_clamped() {
        let tiny = FontMetrics::compute(&mono_raw(), &request(0.5));
        let floor = FontMetrics::compute(&mono_raw(), &request(5.0));
        assert_eq!(tiny, floor);

        let huge = FontMetrics::compute(&mono_raw(), &request(1000.0));
        let ceiling = FontMetrics::compute(&mono_raw(), &request(150.0));
        assert_eq!(huge, ceiling);
    }

    #[test]
    fn dpi_scale_grows_cells() {
        let mut req = request(12.0);
        req.dpi_scale = 2.0;
        let metrics = FontMetrics::compute(&mono_raw(), &req);
        // 32px * 0.6 = 19.2 -> 19
        assert_eq!(metrics.cell_width, 19.0);
    }

    #[test]
    fn line_gap_is_split_between_ascent_and_descent() {
        let mut raw = mono_raw();
        raw.line_gap = 120.0;
        let metrics = FontMetrics::compute(&raw, &request(12.0));
        // half gap = 60 units = 1.0px at 16.666px/em
        assert_eq!(metrics.ascent, 15.0);
        assert_eq!(metrics.descent, 5.0);
    }

    #[test]
    fn decorations_stay_inside_the_cell() {
        let metrics = FontMetrics::compute(&mono_raw(), &request(12.0));
        assert!(metrics.underline_position > metrics.ascent - 1.0);
        assert!(metrics.underline_position + metrics.underline_thickness <= metrics.cell_height);
        assert!(metrics.strikeout_position < metrics.ascent);
        assert!(metrics.underline_thickness >= 1.0);
    }
}
