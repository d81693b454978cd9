//! Pixel geometry of the grid.
//!
//! Cells are whole pixels in both directions, so column `c` always starts at
//! exactly `c * cell_width` no matter what glyph is drawn in it.

use nvgrid_fonts::FontMetrics;

/// Cursor bar/underline thickness at scale 1.0.
const CURSOR_SLIVER_PX: f32 = 2.0;

/// Axis-aligned rectangle in surface pixels (right/bottom exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

/// Size of a surface in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Per-cell layout metrics, in pixels relative to the cell's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub cell_width: f32,
    pub cell_height: f32,
    /// Baseline offset from the cell top.
    pub ascent: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
    pub strikeout_position: f32,
    /// Size glyphs are rasterised at.
    pub font_size_px: f32,
    /// Display scale; sizes decorations such as the cursor bar.
    pub scale: f32,
}

impl CellMetrics {
    /// Metrics for a bare cell size, with decorations placed proportionally.
    /// Sizes are rounded up to whole pixels.
    pub fn new(cell_width: f32, cell_height: f32) -> Self {
        let cell_width = cell_width.ceil().max(1.0);
        let cell_height = cell_height.ceil().max(1.0);
        let ascent = (cell_height * 0.8).round();
        Self {
            cell_width,
            cell_height,
            ascent,
            underline_position: (ascent + 1.0).min(cell_height - 1.0).max(0.0),
            underline_thickness: 1.0,
            strikeout_position: (ascent * 0.65).round(),
            font_size_px: cell_height * 0.8,
            scale: 1.0,
        }
    }

    pub fn from_font(metrics: &FontMetrics, scale: f32) -> Self {
        Self {
            cell_width: metrics.cell_width.ceil().max(1.0),
            cell_height: metrics.cell_height.ceil().max(1.0),
            ascent: metrics.ascent,
            underline_position: metrics.underline_position,
            underline_thickness: metrics.underline_thickness,
            strikeout_position: metrics.strikeout_position,
            font_size_px: metrics.font_size_px,
            scale: if scale > 0.0 { scale } else { 1.0 },
        }
    }

    /// Rectangle of `span` cells starting at `(row, col)`.
    pub fn cell_rect(&self, row: usize, col: usize, span: usize) -> PixelRect {
        let left = col as f32 * self.cell_width;
        let top = row as f32 * self.cell_height;
        PixelRect::new(
            left,
            top,
            left + span as f32 * self.cell_width,
            top + self.cell_height,
        )
    }

    /// Rectangle of a full grid row.
    pub fn row_rect(&self, row: usize, cols: usize) -> PixelRect {
        self.cell_rect(row, 0, cols)
    }

    /// Thickness of the vertical/horizontal cursor bars.
    pub fn cursor_sliver(&self) -> f32 {
        (CURSOR_SLIVER_PX * self.scale).round().max(1.0)
    }

    /// Pixel size needed to show `rows x cols` cells.
    pub fn grid_to_pixel_size(&self, rows: usize, cols: usize) -> PixelSize {
        PixelSize {
            width: (self.cell_width.ceil() * cols as f32) as u32,
            height: (self.cell_height.ceil() * rows as f32) as u32,
        }
    }

    /// Number of whole cells that fit in a surface, as `(rows, cols)`.
    pub fn pixel_to_grid_size(&self, width: u32, height: u32) -> (usize, usize) {
        (
            (height as f32 / self.cell_height).floor() as usize,
            (width as f32 / self.cell_width).floor() as usize,
        )
    }

    /// Grid cell under a pixel position, as `(row, col)`.
    pub fn cursor_pixel_to_grid(&self, x: f32, y: f32) -> (usize, usize) {
        (
            (y.max(0.0) / self.cell_height).floor() as usize,
            (x.max(0.0) / self.cell_width).floor() as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_whole_pixels() {
        let metrics = CellMetrics::new(7.2, 15.01);
        assert_eq!(metrics.cell_width, 8.0);
        assert_eq!(metrics.cell_height, 16.0);
    }

    #[test]
    fn cell_rect_spans_columns() {
        let metrics = CellMetrics::new(10.0, 20.0);
        assert_eq!(
            metrics.cell_rect(2, 3, 2),
            PixelRect::new(30.0, 40.0, 50.0, 60.0)
        );
        assert_eq!(
            metrics.row_rect(1, 80),
            PixelRect::new(0.0, 20.0, 800.0, 40.0)
        );
    }

    #[test]
    fn grid_and_pixel_sizes_map_both_ways() {
        let metrics = CellMetrics::new(9.0, 18.0);
        let size = metrics.grid_to_pixel_size(24, 80);
        assert_eq!(size, PixelSize::new(720, 432));
        assert_eq!(metrics.pixel_to_grid_size(size.width, size.height), (24, 80));
        // Leftover pixels do not make a partial cell.
        assert_eq!(metrics.pixel_to_grid_size(728, 449), (24, 80));
    }

    #[test]
    fn pointer_maps_to_cell() {
        let metrics = CellMetrics::new(10.0, 20.0);
        assert_eq!(metrics.cursor_pixel_to_grid(0.0, 0.0), (0, 0));
        assert_eq!(metrics.cursor_pixel_to_grid(19.9, 39.9), (1, 1));
        assert_eq!(metrics.cursor_pixel_to_grid(-4.0, 25.0), (1, 0));
    }

    #[test]
    fn cursor_sliver_scales() {
        let mut metrics = CellMetrics::new(10.0, 20.0);
        assert_eq!(metrics.cursor_sliver(), 2.0);
        metrics.scale = 2.0;
        assert_eq!(metrics.cursor_sliver(), 4.0);
    }

    #[test]
    fn rect_intersection() {
        let a = PixelRect::new(0.0, 0.0, 10.0, 10.0);
        let b = PixelRect::new(5.0, 5.0, 20.0, 20.0);
        assert_eq!(a.intersect(&b), PixelRect::new(5.0, 5.0, 10.0, 10.0));
        assert!(a.intersect(&PixelRect::new(11.0, 0.0, 12.0, 1.0)).is_empty());
    }
}
