//! Turns grid rows into draw calls.
//!
//! A row is split into runs of equal highlight id. Each run becomes one
//! background fill and, if it has any ink, one styled text run. Glyph
//! positions come from the column index alone, so a glyph whose natural
//! advance differs from the cell width still lands on its column.

use crate::color::Rgb;
use crate::cursor::Cursor;
use crate::grid::{Cell, Grid};
use crate::highlight::{HighlightAttributes, HighlightFlags, HighlightTable};
use crate::layout::{CellMetrics, PixelRect, PixelSize};

/// Text style after highlight resolution.
///
/// Undercurl is drawn as a plain underline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub foreground: Rgb,
    /// Color for underline decorations.
    pub special: Rgb,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl TextStyle {
    pub fn resolve(table: &HighlightTable, attrs: &HighlightAttributes) -> Self {
        let flags = attrs.flags;
        Self {
            foreground: table.resolve_foreground_of(attrs),
            special: table.resolve_special_of(attrs),
            bold: flags.contains(HighlightFlags::BOLD),
            italic: flags.contains(HighlightFlags::ITALIC),
            underline: flags.intersects(HighlightFlags::UNDERLINE | HighlightFlags::UNDERCURL),
            strikethrough: flags.contains(HighlightFlags::STRIKETHROUGH),
        }
    }

    fn has_decoration(&self) -> bool {
        self.underline || self.strikethrough
    }
}

/// A character placed at a fixed pixel column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    /// Left edge of the glyph's cell.
    pub x: f32,
    /// Cells the glyph occupies (1 or 2).
    pub columns: u8,
}

/// A styled span of glyphs on one row.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Cells the run covers; decorations span its full width.
    pub rect: PixelRect,
    /// Drawing outside this rectangle is discarded.
    pub clip: PixelRect,
    pub baseline: f32,
    pub glyphs: Vec<PlacedGlyph>,
    pub style: TextStyle,
}

/// Drawing target for the compositor.
pub trait Canvas {
    fn fill_rect(&mut self, rect: PixelRect, color: Rgb);
    fn draw_text(&mut self, run: &TextRun);
}

/// Redraw one grid row. Rows outside the grid are ignored.
pub fn draw_grid_line<C: Canvas + ?Sized>(
    canvas: &mut C,
    grid: &Grid,
    table: &HighlightTable,
    metrics: &CellMetrics,
    row: usize,
) {
    let Some(cells) = grid.row(row) else {
        return;
    };
    let Some(first) = cells.first() else {
        return;
    };
    let clip = metrics.row_rect(row, cells.len());

    let mut run_start = 0;
    let mut current = first.hl_id;
    for (col, cell) in cells.iter().enumerate().skip(1) {
        if cell.hl_id != current {
            draw_run(canvas, cells, table, metrics, row, run_start..col, current, clip);
            run_start = col;
            current = cell.hl_id;
        }
    }
    draw_run(
        canvas,
        cells,
        table,
        metrics,
        row,
        run_start..cells.len(),
        current,
        clip,
    );
}

#[allow(clippy::too_many_arguments)]
fn draw_run<C: Canvas + ?Sized>(
    canvas: &mut C,
    cells: &[Cell],
    table: &HighlightTable,
    metrics: &CellMetrics,
    row: usize,
    cols: std::ops::Range<usize>,
    hl_id: u16,
    clip: PixelRect,
) {
    let rect = metrics.cell_rect(row, cols.start, cols.len());
    canvas.fill_rect(rect, table.resolve_background(hl_id));

    let style = TextStyle::resolve(table, table.get(hl_id));
    let glyphs: Vec<PlacedGlyph> = cells[cols.clone()]
        .iter()
        .zip(cols)
        .filter(|(cell, _)| !cell.is_continuation() && cell.ch != ' ')
        .map(|(cell, col)| PlacedGlyph {
            ch: cell.ch,
            x: col as f32 * metrics.cell_width,
            columns: if cell.is_wide { 2 } else { 1 },
        })
        .collect();

    if glyphs.is_empty() && !style.has_decoration() {
        return;
    }
    canvas.draw_text(&TextRun {
        rect,
        clip,
        baseline: rect.top + metrics.ascent,
        glyphs,
        style,
    });
}

/// Draw the cursor over its cell. Nothing is drawn without an active mode
/// or when the cursor is outside the grid.
pub fn draw_cursor<C: Canvas + ?Sized>(
    canvas: &mut C,
    grid: &Grid,
    table: &HighlightTable,
    cursor: &Cursor,
    metrics: &CellMetrics,
) {
    let Some(mode) = cursor.active_mode() else {
        return;
    };
    let (row, col) = (cursor.row(), cursor.col());
    let Some(cell) = grid.cell(row, col) else {
        return;
    };
    let Some(attrs) = cursor.effective_attributes(table, cell.hl_id) else {
        return;
    };

    let span = if cell.is_wide { 2 } else { 1 };
    let cell_rect = metrics
        .cell_rect(row, col, span)
        .intersect(&metrics.row_rect(row, grid.cols()));
    let rect = mode.shape.shape_rect(cell_rect, metrics.cursor_sliver());
    canvas.fill_rect(rect, table.resolve_background_of(&attrs));

    if mode.shape.draws_character() && !cell.is_continuation() && cell.ch != ' ' {
        canvas.draw_text(&TextRun {
            rect: cell_rect,
            clip: rect,
            baseline: cell_rect.top + metrics.ascent,
            glyphs: vec![PlacedGlyph {
                ch: cell.ch,
                x: cell_rect.left,
                columns: span as u8,
            }],
            style: TextStyle::resolve(table, &attrs),
        });
    }
}

/// Fill the whole grid area with the default background.
pub fn draw_grid_background<C: Canvas + ?Sized>(
    canvas: &mut C,
    grid: &Grid,
    table: &HighlightTable,
    metrics: &CellMetrics,
) {
    let size = metrics.grid_to_pixel_size(grid.rows(), grid.cols());
    canvas.fill_rect(
        PixelRect::new(0.0, 0.0, size.width as f32, size.height as f32),
        table.resolve_background(0),
    );
}

/// Fill the strips right of and below the grid that are too small to hold
/// a whole cell.
pub fn draw_borders<C: Canvas + ?Sized>(
    canvas: &mut C,
    grid: &Grid,
    table: &HighlightTable,
    metrics: &CellMetrics,
    surface: PixelSize,
) {
    let grid_size = metrics.grid_to_pixel_size(grid.rows(), grid.cols());
    let (width, height) = (surface.width as f32, surface.height as f32);
    let color = table.resolve_background(0);

    if grid_size.width < surface.width {
        canvas.fill_rect(
            PixelRect::new(grid_size.width as f32, 0.0, width, height),
            color,
        );
    }
    if grid_size.height < surface.height {
        canvas.fill_rect(
            PixelRect::new(0.0, grid_size.height as f32, width, height),
            color,
        );
    }
}

/// Redraw every row, the cursor (unless hidden) and the border strips.
pub fn draw_full_grid<C: Canvas + ?Sized>(
    canvas: &mut C,
    grid: &Grid,
    table: &HighlightTable,
    cursor: Option<&Cursor>,
    metrics: &CellMetrics,
    surface: PixelSize,
) {
    for row in 0..grid.rows() {
        draw_grid_line(canvas, grid, table, metrics, row);
    }
    if let Some(cursor) = cursor {
        draw_cursor(canvas, grid, table, cursor, metrics);
    }
    draw_borders(canvas, grid, table, metrics, surface);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{CursorShape, ModeInfo};
    use crate::highlight::{DefaultColors, HighlightUpdate};

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Fill(PixelRect, Rgb),
        Text(TextRun),
    }

    #[derive(Default)]
    struct Recorder(Vec<Op>);

    impl Canvas for Recorder {
        fn fill_rect(&mut self, rect: PixelRect, color: Rgb) {
            self.0.push(Op::Fill(rect, color));
        }

        fn draw_text(&mut self, run: &TextRun) {
            self.0.push(Op::Text(run.clone()));
        }
    }

    fn table() -> HighlightTable {
        let mut table = HighlightTable::new();
        table.set_default_colors(DefaultColors {
            foreground: Rgb::WHITE,
            background: Rgb::BLACK,
            special: Rgb::WHITE,
        });
        table.define(
            1,
            &HighlightUpdate {
                foreground: Some(Rgb(0xff0000)),
                background: Some(Rgb(0x000080)),
                set: HighlightFlags::UNDERCURL,
                ..Default::default()
            },
        );
        table
    }

    fn metrics() -> CellMetrics {
        CellMetrics::new(10.0, 20.0)
    }

    #[test]
    fn row_splits_into_attribute_runs() {
        let mut grid = Grid::new(6, 2).unwrap();
        grid.write_run(1, 0, "ab", 1, 0).unwrap();
        grid.write_run(1, 2, "cd", 1, 1).unwrap();

        let mut canvas = Recorder::default();
        draw_grid_line(&mut canvas, &grid, &table(), &metrics(), 1);

        let fills: Vec<_> = canvas
            .0
            .iter()
            .filter_map(|op| match op {
                Op::Fill(rect, color) => Some((*rect, *color)),
                Op::Text(_) => None,
            })
            .collect();
        assert_eq!(
            fills,
            vec![
                (PixelRect::new(0.0, 20.0, 20.0, 40.0), Rgb::BLACK),
                (PixelRect::new(20.0, 20.0, 40.0, 40.0), Rgb(0x000080)),
                (PixelRect::new(40.0, 20.0, 60.0, 40.0), Rgb::BLACK),
            ]
        );

        // Background of a run always precedes its text.
        assert!(matches!(canvas.0[0], Op::Fill(..)));
        let Op::Text(first) = &canvas.0[1] else {
            panic!("expected text after first fill");
        };
        assert_eq!(first.glyphs.len(), 2);
        assert_eq!(first.baseline, 20.0 + metrics().ascent);
        let Op::Text(second) = &canvas.0[3] else {
            panic!("expected text after second fill");
        };
        assert_eq!(second.style.foreground, Rgb(0xff0000));
        assert!(second.style.underline);
        // Trailing blanks have no ink and no decoration.
        assert_eq!(canvas.0.len(), 5);
    }

    #[test]
    fn glyphs_sit_on_column_boundaries() {
        let mut grid = Grid::new(8, 1).unwrap();
        grid.write_run(0, 0, "a", 1, 0).unwrap();
        grid.write_run(0, 1, "字", 1, 0).unwrap();
        grid.write_run(0, 2, "", 1, 0).unwrap();
        grid.write_run(0, 3, "b", 1, 0).unwrap();

        let mut canvas = Recorder::default();
        draw_grid_line(&mut canvas, &grid, &table(), &metrics(), 0);

        let Op::Text(run) = &canvas.0[1] else {
            panic!("expected text run");
        };
        let placed: Vec<_> = run.glyphs.iter().map(|g| (g.ch, g.x, g.columns)).collect();
        assert_eq!(
            placed,
            vec![('a', 0.0, 1), ('字', 10.0, 2), ('b', 30.0, 1)]
        );
    }

    #[test]
    fn rows_outside_grid_draw_nothing() {
        let grid = Grid::new(4, 2).unwrap();
        let mut canvas = Recorder::default();
        draw_grid_line(&mut canvas, &grid, &table(), &metrics(), 2);
        assert!(canvas.0.is_empty());
    }

    #[test]
    fn block_cursor_redraws_character_inverted() {
        let mut grid = Grid::new(4, 2).unwrap();
        grid.write_run(0, 1, "x", 1, 0).unwrap();
        let mut cursor = Cursor::new();
        cursor
            .set_mode_infos(vec![ModeInfo {
                shape: CursorShape::Block,
                hl_id: 0,
                cell_percentage: 0.0,
            }])
            .unwrap();
        cursor.set_mode(0).unwrap();
        cursor.move_to(0, 1);

        let mut canvas = Recorder::default();
        draw_cursor(&mut canvas, &grid, &table(), &cursor, &metrics());

        let cell = PixelRect::new(10.0, 0.0, 20.0, 20.0);
        assert_eq!(canvas.0[0], Op::Fill(cell, Rgb::WHITE));
        let Op::Text(run) = &canvas.0[1] else {
            panic!("expected cursor character");
        };
        assert_eq!(run.glyphs[0].ch, 'x');
        assert_eq!(run.style.foreground, Rgb::BLACK);
    }

    #[test]
    fn bar_cursor_draws_sliver_only() {
        let grid = Grid::new(4, 2).unwrap();
        let mut cursor = Cursor::new();
        cursor
            .set_mode_infos(vec![ModeInfo {
                shape: CursorShape::Vertical,
                hl_id: 1,
                cell_percentage: 0.25,
            }])
            .unwrap();
        cursor.set_mode(0).unwrap();
        cursor.move_to(1, 2);

        let mut canvas = Recorder::default();
        draw_cursor(&mut canvas, &grid, &table(), &cursor, &metrics());
        assert_eq!(
            canvas.0,
            vec![Op::Fill(PixelRect::new(20.0, 20.0, 22.0, 40.0), Rgb(0x000080))]
        );
    }

    #[test]
    fn cursor_without_mode_is_invisible() {
        let grid = Grid::new(4, 2).unwrap();
        let cursor = Cursor::new();
        let mut canvas = Recorder::default();
        draw_cursor(&mut canvas, &grid, &table(), &cursor, &metrics());
        assert!(canvas.0.is_empty());
    }

    #[test]
    fn borders_cover_leftover_pixels() {
        let grid = Grid::new(4, 2).unwrap();
        let mut canvas = Recorder::default();
        draw_borders(
            &mut canvas,
            &grid,
            &table(),
            &metrics(),
            PixelSize::new(45, 47),
        );
        assert_eq!(
            canvas.0,
            vec![
                Op::Fill(PixelRect::new(40.0, 0.0, 45.0, 47.0), Rgb::BLACK),
                Op::Fill(PixelRect::new(0.0, 40.0, 45.0, 47.0), Rgb::BLACK),
            ]
        );

        let mut canvas = Recorder::default();
        draw_borders(
            &mut canvas,
            &grid,
            &table(),
            &metrics(),
            PixelSize::new(40, 40),
        );
        assert!(canvas.0.is_empty());
    }
}
