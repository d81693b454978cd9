//! The persistent character+attribute grid.
//!
//! Cells live in one row-major `Vec`. Every operation checks its row and
//! column arguments against the current size, so a late event for a grid
//! that has since shrunk is rejected instead of touching another row.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::ProtocolError;

/// Character stored in the right half of a double-width pair.
pub const WIDE_CONTINUATION: char = '\0';

/// One grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// First code point of the cell's grapheme, or [`WIDE_CONTINUATION`].
    pub ch: char,
    pub hl_id: u16,
    /// The glyph spans this column and the next.
    pub is_wide: bool,
}

impl Cell {
    pub const BLANK: Cell = Cell {
        ch: ' ',
        hl_id: 0,
        is_wide: false,
    };

    pub fn new(ch: char, hl_id: u16) -> Self {
        Cell {
            ch,
            hl_id,
            is_wide: false,
        }
    }

    /// Right half of a wide pair.
    pub fn is_continuation(&self) -> bool {
        self.ch == WIDE_CONTINUATION
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::BLANK
    }
}

/// Rectangle a scroll applies to, in grid coordinates (end-exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// `rows x cols` cells. A default grid has no cells until the first resize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(cols: usize, rows: usize) -> Result<Self, ProtocolError> {
        let mut grid = Grid::default();
        grid.resize(cols, rows)?;
        Ok(grid)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Reallocate to `cols x rows` blank cells. Returns `false` without
    /// touching the contents when the size is unchanged.
    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<bool, ProtocolError> {
        if cols == 0 || rows == 0 {
            return Err(ProtocolError::EmptyGrid { cols, rows });
        }
        if cols == self.cols && rows == self.rows {
            return Ok(false);
        }
        log::debug!("grid resize {}x{} -> {}x{}", self.cols, self.rows, cols, rows);
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![Cell::BLANK; cols * rows];
        Ok(true)
    }

    /// Reset every cell to blank with the default attribute.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        if row < self.rows {
            let start = row * self.cols;
            Some(&self.cells[start..start + self.cols])
        } else {
            None
        }
    }

    /// Row contents as text, with wide-pair placeholders omitted.
    pub fn row_text(&self, row: usize) -> Option<String> {
        self.row(row).map(|cells| {
            cells
                .iter()
                .filter(|cell| !cell.is_continuation())
                .map(|cell| cell.ch)
                .collect()
        })
    }

    /// Write `text` starting at `col_start`, `repeat` times, with `hl_id`.
    ///
    /// Each grapheme takes one column; cells past the end of the row are
    /// dropped. Empty `text` is the right half of a wide character: the
    /// previous cell is marked wide and this column becomes a placeholder.
    ///
    /// Returns the column following the last one written.
    pub fn write_run(
        &mut self,
        row: usize,
        col_start: usize,
        text: &str,
        repeat: usize,
        hl_id: u16,
    ) -> Result<usize, ProtocolError> {
        if row >= self.rows {
            return Err(ProtocolError::RowOutOfBounds {
                row,
                rows: self.rows,
            });
        }
        if col_start >= self.cols {
            return Err(ProtocolError::ColumnOutOfBounds {
                col: col_start,
                cols: self.cols,
            });
        }

        let base = row * self.cols;
        if text.is_empty() {
            if col_start > 0 {
                self.cells[base + col_start - 1].is_wide = true;
            }
            self.cells[base + col_start] = Cell::new(WIDE_CONTINUATION, hl_id);
            return Ok(col_start + 1);
        }

        let mut col = col_start;
        'repeat: for _ in 0..repeat.max(1) {
            for grapheme in text.graphemes(true) {
                if col >= self.cols {
                    break 'repeat;
                }
                let ch = grapheme.chars().next().unwrap_or(' ');
                self.cells[base + col] = Cell::new(ch, hl_id);
                col += 1;
            }
        }
        Ok(col)
    }

    /// Shift the rows of `region` by `rows` (positive moves content up).
    ///
    /// Only target rows whose source row is also inside the region are
    /// written; rows vacated by the shift keep their old contents until the
    /// editor redraws them. Returns the rows that received content.
    pub fn scroll(
        &mut self,
        region: ScrollRegion,
        rows: i64,
        cols: i64,
    ) -> Result<Range<usize>, ProtocolError> {
        if cols != 0 {
            return Err(ProtocolError::HorizontalScroll(cols));
        }
        let ScrollRegion {
            top,
            bottom,
            left,
            right,
        } = region;
        if top > bottom || bottom > self.rows || left > right || right > self.cols {
            return Err(ProtocolError::ScrollRegion {
                top,
                bottom,
                left,
                right,
                rows: self.rows,
                cols: self.cols,
            });
        }

        let delta = usize::try_from(rows.unsigned_abs()).unwrap_or(usize::MAX);
        if rows == 0 || delta >= bottom - top {
            return Ok(top..top);
        }

        let width = right - left;
        let copy_row = |cells: &mut Vec<Cell>, src: usize, dst: usize| {
            let src_start = src * self.cols + left;
            cells.copy_within(src_start..src_start + width, dst * self.cols + left);
        };

        if rows > 0 {
            let targets = top..bottom - delta;
            for target in targets.clone() {
                copy_row(&mut self.cells, target + delta, target);
            }
            Ok(targets)
        } else {
            let targets = top + delta..bottom;
            for target in targets.clone().rev() {
                copy_row(&mut self.cells, target - delta, target);
            }
            Ok(targets)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lettered(cols: usize, rows: usize) -> Grid {
        let mut grid = Grid::new(cols, rows).unwrap();
        for row in 0..rows {
            let letter = char::from(b'a' + row as u8);
            grid.write_run(row, 0, &letter.to_string(), cols, row as u16)
                .unwrap();
        }
        grid
    }

    #[test]
    fn new_grid_is_blank() {
        let grid = Grid::new(4, 2).unwrap();
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.row_text(0).unwrap(), "    ");
        assert_eq!(grid.cell(1, 3), Some(&Cell::BLANK));
        assert_eq!(grid.cell(2, 0), None);
    }

    #[test]
    fn resize_same_size_keeps_contents() {
        let mut grid = lettered(3, 2);
        assert!(!grid.resize(3, 2).unwrap());
        assert_eq!(grid.row_text(1).unwrap(), "bbb");
    }

    #[test]
    fn resize_new_size_blanks() {
        let mut grid = lettered(3, 2);
        assert!(grid.resize(5, 3).unwrap());
        for row in 0..3 {
            assert_eq!(grid.row_text(row).unwrap(), "     ");
        }
    }

    #[test]
    fn resize_rejects_zero() {
        let mut grid = Grid::default();
        assert_eq!(
            grid.resize(0, 10),
            Err(ProtocolError::EmptyGrid { cols: 0, rows: 10 })
        );
    }

    #[test]
    fn clear_resets_attributes() {
        let mut grid = lettered(3, 2);
        grid.clear();
        assert!(grid.row(0).unwrap().iter().all(|c| *c == Cell::BLANK));
    }

    #[test]
    fn write_run_repeats_text() {
        let mut grid = Grid::new(10, 1).unwrap();
        let next = grid.write_run(0, 2, "ab", 3, 7).unwrap();
        assert_eq!(next, 8);
        assert_eq!(grid.row_text(0).unwrap(), "  ababab  ");
        assert!(grid.row(0).unwrap()[2..8].iter().all(|c| c.hl_id == 7));
        assert_eq!(grid.cell(0, 1).unwrap().hl_id, 0);
    }

    #[test]
    fn write_run_clips_at_row_end() {
        let mut grid = Grid::new(4, 2).unwrap();
        let next = grid.write_run(0, 2, "x", 10, 1).unwrap();
        assert_eq!(next, 4);
        assert_eq!(grid.row_text(0).unwrap(), "  xx");
        // The next row is untouched.
        assert_eq!(grid.row_text(1).unwrap(), "    ");
    }

    #[test]
    fn write_run_out_of_bounds_is_rejected() {
        let mut grid = Grid::new(4, 2).unwrap();
        assert_eq!(
            grid.write_run(2, 0, "x", 1, 0),
            Err(ProtocolError::RowOutOfBounds { row: 2, rows: 2 })
        );
        assert_eq!(
            grid.write_run(0, 4, "x", 1, 0),
            Err(ProtocolError::ColumnOutOfBounds { col: 4, cols: 4 })
        );
    }

    #[test]
    fn empty_text_marks_previous_cell_wide() {
        let mut grid = Grid::new(6, 1).unwrap();
        let next = grid.write_run(0, 2, "字", 1, 3).unwrap();
        let next = grid.write_run(0, next, "", 1, 3).unwrap();
        assert_eq!(next, 4);

        let left = grid.cell(0, 2).unwrap();
        assert_eq!(left.ch, '字');
        assert!(left.is_wide);
        let right = grid.cell(0, 3).unwrap();
        assert!(right.is_continuation());
        assert!(!right.is_wide);
        assert_eq!(grid.row_text(0).unwrap(), "  字  ");
    }

    #[test]
    fn narrow_write_clears_wide_flag() {
        let mut grid = Grid::new(4, 1).unwrap();
        grid.write_run(0, 0, "字", 1, 0).unwrap();
        grid.write_run(0, 1, "", 1, 0).unwrap();
        grid.write_run(0, 0, "ab", 1, 0).unwrap();
        assert!(!grid.cell(0, 0).unwrap().is_wide);
        assert_eq!(grid.row_text(0).unwrap(), "ab  ");
    }

    #[test]
    fn combining_marks_share_a_cell() {
        let mut grid = Grid::new(4, 1).unwrap();
        let next = grid.write_run(0, 0, "e\u{301}x", 1, 0).unwrap();
        assert_eq!(next, 2);
        assert_eq!(grid.cell(0, 0).unwrap().ch, 'e');
        assert_eq!(grid.cell(0, 1).unwrap().ch, 'x');
    }

    #[test]
    fn scroll_up_moves_content() {
        let mut grid = lettered(3, 5);
        let region = ScrollRegion {
            top: 1,
            bottom: 5,
            left: 0,
            right: 3,
        };
        let targets = grid.scroll(region, 2, 0).unwrap();
        assert_eq!(targets, 1..3);
        let rows: Vec<String> = (0..5).map(|r| grid.row_text(r).unwrap()).collect();
        assert_eq!(rows, ["aaa", "ddd", "eee", "ddd", "eee"]);
    }

    #[test]
    fn scroll_down_moves_content() {
        let mut grid = lettered(3, 5);
        let region = ScrollRegion {
            top: 0,
            bottom: 4,
            left: 0,
            right: 3,
        };
        let targets = grid.scroll(region, -1, 0).unwrap();
        assert_eq!(targets, 1..4);
        let rows: Vec<String> = (0..5).map(|r| grid.row_text(r).unwrap()).collect();
        assert_eq!(rows, ["aaa", "aaa", "bbb", "ccc", "eee"]);
    }

    #[test]
    fn scroll_respects_column_bounds() {
        let mut grid = lettered(4, 3);
        let region = ScrollRegion {
            top: 0,
            bottom: 3,
            left: 1,
            right: 3,
        };
        grid.scroll(region, 1, 0).unwrap();
        assert_eq!(grid.row_text(0).unwrap(), "abba");
        assert_eq!(grid.row_text(1).unwrap(), "bccb");
        assert_eq!(grid.cell(0, 1).unwrap().hl_id, 1);
        assert_eq!(grid.cell(0, 0).unwrap().hl_id, 0);
    }

    #[test]
    fn scroll_by_region_height_copies_nothing() {
        let mut grid = lettered(2, 3);
        let before = grid.clone();
        let region = ScrollRegion {
            top: 0,
            bottom: 3,
            left: 0,
            right: 2,
        };
        assert!(grid.scroll(region, 3, 0).unwrap().is_empty());
        assert!(grid.scroll(region, -7, 0).unwrap().is_empty());
        assert_eq!(grid, before);
    }

    #[test]
    fn horizontal_scroll_is_rejected() {
        let mut grid = lettered(2, 3);
        let region = ScrollRegion {
            top: 0,
            bottom: 3,
            left: 0,
            right: 2,
        };
        assert_eq!(
            grid.scroll(region, 1, 1),
            Err(ProtocolError::HorizontalScroll(1))
        );
    }

    #[test]
    fn scroll_region_outside_grid_is_rejected() {
        let mut grid = lettered(2, 3);
        let region = ScrollRegion {
            top: 0,
            bottom: 4,
            left: 0,
            right: 2,
        };
        assert!(matches!(
            grid.scroll(region, 1, 0),
            Err(ProtocolError::ScrollRegion { .. })
        ));
    }
}
