//! The redraw event dispatcher.
//!
//! [`GridRenderer`] owns every piece of renderer state: grid, highlight
//! table, cursor, frame manager and the window host. Events mutate the model
//! and redraw the affected rows straight away, so later events in the same
//! batch see up-to-date pixels; nothing becomes visible until `flush`.
//!
//! Protocol violations either panic (strict mode) or are logged and skip
//! the offending event (lenient mode). Strict is the default in debug
//! builds.

use serde_json::Value;

use nvgrid_config::Config;
use nvgrid_fonts::{FontRequest, GuiFont};
use nvgrid_render::compositor::{
    draw_borders, draw_cursor, draw_full_grid, draw_grid_background, draw_grid_line,
};
use nvgrid_render::{
    CellMetrics, Cursor, DefaultColors, FrameManager, Grid, HighlightTable, PixelSize,
    PresentOutcome, PresentationBackend, ProtocolError, RenderError, ScrollRegion,
};

use crate::error::DispatchError;
use crate::events::{EventError, LineCell, RedrawEvent, batch_events, decode_tuples};
use crate::host::{ImePosition, WindowHost, compose_title};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    /// Events have arrived since the last `flush`.
    Open,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RendererOptions {
    /// Panic on protocol violations instead of skipping the event.
    pub strict: bool,
    pub title_suffix: String,
    /// Size used when `guifont` has no `:h` option.
    pub default_font_size: f32,
}

impl RendererOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            strict: cfg!(debug_assertions),
            title_suffix: config.title_suffix.clone(),
            default_font_size: config.font_size,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

pub struct GridRenderer<B: PresentationBackend, H: WindowHost> {
    grid: Grid,
    highlights: HighlightTable,
    cursor: Cursor,
    frames: FrameManager<B>,
    host: H,
    batch: BatchState,
    busy: bool,
    title: String,
    options: RendererOptions,
    violations: u64,
}

impl<B: PresentationBackend, H: WindowHost> GridRenderer<B, H> {
    pub fn new(
        frames: FrameManager<B>,
        host: H,
        cols: usize,
        rows: usize,
        options: RendererOptions,
    ) -> Result<Self, DispatchError> {
        Ok(Self {
            grid: Grid::new(cols, rows)?,
            highlights: HighlightTable::new(),
            cursor: Cursor::new(),
            frames,
            host,
            batch: BatchState::Idle,
            busy: false,
            title: String::new(),
            options,
            violations: 0,
        })
    }

    /// Build the frame manager and renderer from user configuration.
    pub fn from_config(backend: B, host: H, config: &Config) -> Result<Self, DispatchError> {
        let frames = FrameManager::new(
            backend,
            FontRequest::from_config(config),
            config.frame_latency_timeout(),
        )?;
        Self::new(
            frames,
            host,
            config.cols,
            config.rows,
            RendererOptions::from_config(config),
        )
    }

    /// Process the parameter array of one `redraw` notification.
    ///
    /// A batch may end without `flush`; the frame then stays open until a
    /// later batch flushes. Returns the number of events applied.
    pub fn handle_batch(&mut self, batch: &Value) -> Result<usize, DispatchError> {
        let mut applied = 0;
        for (index, raw) in batch_events(batch)?.iter().enumerate() {
            let tuples = match decode_tuples(index, raw) {
                Ok(tuples) => tuples,
                Err(e) => {
                    self.violation("redraw", &DispatchError::Event(e));
                    continue;
                }
            };
            for decoded in tuples {
                let event = match decoded {
                    Ok(event) => event,
                    Err(e) => {
                        let name = match &e {
                            EventError::NotATuple { event, .. }
                            | EventError::InvalidField { event, .. } => event.clone(),
                            _ => "redraw".to_string(),
                        };
                        self.violation(&name, &DispatchError::Event(e));
                        continue;
                    }
                };
                let name = event.name().to_string();
                match self.dispatch(event) {
                    Ok(()) => applied += 1,
                    Err(e) if e.is_protocol_violation() => self.violation(&name, &e),
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(applied)
    }

    /// Apply one decoded event.
    pub fn dispatch(&mut self, event: RedrawEvent) -> Result<(), DispatchError> {
        self.open_batch();
        log::trace!("redraw event {}", event.name());

        match event {
            RedrawEvent::GridResize { cols, rows, .. } => {
                if self.grid.resize(cols, rows)? {
                    log::debug!("grid resized to {cols}x{rows}");
                }
            }
            RedrawEvent::GridClear { .. } => {
                self.grid.clear();
                let metrics = *self.frames.metrics();
                draw_grid_background(
                    self.frames.canvas(),
                    &self.grid,
                    &self.highlights,
                    &metrics,
                );
            }
            RedrawEvent::DefaultColorsSet {
                foreground,
                background,
                special,
            } => {
                let current = self.highlights.defaults();
                self.highlights.set_default_colors(DefaultColors {
                    foreground: foreground.unwrap_or(current.foreground),
                    background: background.unwrap_or(current.background),
                    special: special.unwrap_or(current.special),
                });
            }
            RedrawEvent::HlAttrDefine { id, update } => {
                let id = HighlightTable::checked_id(id)?;
                self.highlights.define(id, &update);
            }
            RedrawEvent::GridLine {
                row,
                col_start,
                cells,
                ..
            } => {
                let written = self.write_line(row, col_start, &cells);
                self.redraw_row(row);
                written?;
            }
            RedrawEvent::GridCursorGoto { row, col, .. } => self.cursor_goto(row, col)?,
            RedrawEvent::ModeInfoSet {
                cursor_style_enabled,
                modes,
            } => {
                if !cursor_style_enabled {
                    log::debug!("editor disabled cursor styling, keeping mode shapes");
                }
                self.cursor.set_mode_infos(modes)?;
            }
            RedrawEvent::ModeChange { mode, index } => {
                self.redraw_row(self.cursor.row());
                self.cursor.set_mode(index)?;
                log::trace!("mode '{mode}' ({index})");
            }
            RedrawEvent::BusyStart => {
                self.busy = true;
                self.redraw_row(self.cursor.row());
            }
            RedrawEvent::BusyStop => self.busy = false,
            RedrawEvent::GridScroll {
                top,
                bottom,
                left,
                right,
                rows,
                cols,
                ..
            } => self.scroll(
                ScrollRegion {
                    top,
                    bottom,
                    left,
                    right,
                },
                rows,
                cols,
            )?,
            RedrawEvent::SetTitle(title) => {
                self.title = title;
                let display = compose_title(&self.title, &self.options.title_suffix);
                self.host.set_title(&display);
            }
            RedrawEvent::OptionSet { name, value } => {
                if name == "guifont" {
                    if let Some(value) = value.as_str() {
                        self.set_guifont(value)?;
                    }
                } else {
                    log::trace!("ignoring option '{name}'");
                }
            }
            RedrawEvent::Flush => self.flush()?,
            RedrawEvent::Unknown(name) => log::trace!("ignoring redraw event '{name}'"),
        }
        Ok(())
    }

    /// Resize the presentation surface and repaint everything into it.
    ///
    /// Inside an open batch the repaint joins the pending frame; otherwise
    /// it is presented immediately.
    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), DispatchError> {
        self.frames.resize(PixelSize::new(width, height))?;
        self.frames.begin_draw();
        self.repaint_all();
        if self.batch == BatchState::Idle {
            self.present()?;
        }
        Ok(())
    }

    /// Draw every row, the cursor and the borders from current state.
    pub fn repaint_all(&mut self) {
        let metrics = *self.frames.metrics();
        let size = self.frames.size();
        let cursor = (!self.busy).then_some(&self.cursor);
        draw_full_grid(
            self.frames.canvas(),
            &self.grid,
            &self.highlights,
            cursor,
            &metrics,
            size,
        );
    }

    pub fn grid_to_pixel_size(&self, rows: usize, cols: usize) -> PixelSize {
        self.frames.metrics().grid_to_pixel_size(rows, cols)
    }

    /// Whole cells that fit in `width x height`, as `(rows, cols)`.
    pub fn pixel_to_grid_size(&self, width: u32, height: u32) -> (usize, usize) {
        self.frames.metrics().pixel_to_grid_size(width, height)
    }

    pub fn cursor_pixel_to_grid(&self, x: f32, y: f32) -> (usize, usize) {
        self.frames.metrics().cursor_pixel_to_grid(x, y)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn highlights(&self) -> &HighlightTable {
        &self.highlights
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn frames(&self) -> &FrameManager<B> {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut FrameManager<B> {
        &mut self.frames
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn metrics(&self) -> &CellMetrics {
        self.frames.metrics()
    }

    pub fn batch_state(&self) -> BatchState {
        self.batch
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The editor's title text, without suffix.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.options.strict = strict;
    }

    /// Violations skipped in lenient mode.
    pub fn violation_count(&self) -> u64 {
        self.violations
    }

    fn open_batch(&mut self) {
        if self.batch == BatchState::Idle {
            self.frames.begin_draw();
            self.batch = BatchState::Open;
        }
    }

    fn violation(&mut self, event: &str, error: &DispatchError) {
        if self.options.strict {
            panic!("protocol violation in '{event}': {error}");
        }
        self.violations += 1;
        log::warn!("skipping '{event}': {error}");
    }

    fn redraw_row(&mut self, row: usize) {
        let metrics = *self.frames.metrics();
        draw_grid_line(
            self.frames.canvas(),
            &self.grid,
            &self.highlights,
            &metrics,
            row,
        );
    }

    /// Write the cell runs of one `grid_line` event. The highlight id
    /// carries over from the previous cell and starts at 0.
    fn write_line(
        &mut self,
        row: usize,
        col_start: usize,
        cells: &[LineCell],
    ) -> Result<(), DispatchError> {
        let mut col = col_start;
        let mut hl_id = 0;
        for cell in cells {
            if col >= self.grid.cols() && col != col_start {
                break;
            }
            if let Some(id) = cell.hl_id {
                hl_id = HighlightTable::checked_id(id)?;
            }
            let repeat = cell
                .repeat
                .map_or(1, |repeat| usize::try_from(repeat).unwrap_or(usize::MAX));
            col = self.grid.write_run(row, col, &cell.text, repeat, hl_id)?;
        }
        Ok(())
    }

    fn cursor_goto(&mut self, row: usize, col: usize) -> Result<(), DispatchError> {
        if row >= self.grid.rows() {
            return Err(ProtocolError::RowOutOfBounds {
                row,
                rows: self.grid.rows(),
            }
            .into());
        }
        if col >= self.grid.cols() {
            return Err(ProtocolError::ColumnOutOfBounds {
                col,
                cols: self.grid.cols(),
            }
            .into());
        }

        // Erase the cursor from the row it leaves.
        if self.cursor.row() < self.grid.rows() {
            self.redraw_row(self.cursor.row());
        }
        self.cursor.move_to(row, col);

        let metrics = *self.frames.metrics();
        let position = ImePosition {
            rect: metrics.cell_rect(row, col, 1),
            font_family: self.frames.font().family.clone(),
            font_height: metrics.font_size_px,
        };
        self.host.set_ime_position(position);
        Ok(())
    }

    fn scroll(&mut self, region: ScrollRegion, rows: i64, cols: i64) -> Result<(), DispatchError> {
        let targets = self.grid.scroll(region, rows, cols)?;
        for row in targets.clone() {
            self.redraw_row(row);
        }

        // Rows the cursor was drawn on before and after the shift.
        let cursor_row = self.cursor.row();
        let shifted = i64::try_from(cursor_row)
            .ok()
            .and_then(|row| row.checked_sub(rows))
            .and_then(|row| usize::try_from(row).ok());
        for row in shifted.into_iter().chain(Some(cursor_row)) {
            if row < self.grid.rows() && !targets.contains(&row) {
                self.redraw_row(row);
            }
        }
        Ok(())
    }

    fn set_guifont(&mut self, value: &str) -> Result<(), DispatchError> {
        let Some(parsed) = GuiFont::parse(value, self.options.default_font_size) else {
            log::debug!("empty guifont, keeping current font");
            return Ok(());
        };
        let current = self.frames.font().clone();
        let request = FontRequest {
            family: parsed.family.unwrap_or_else(|| current.family.clone()),
            point_size: parsed.point_size,
            ..current.clone()
        };
        if request == current {
            return Ok(());
        }

        let metrics = match self.frames.set_font(request) {
            Ok(metrics) => metrics,
            Err(RenderError::Font(e)) => {
                log::warn!("guifont '{value}' could not be loaded: {e}");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "guifont '{value}' applied, cell {}x{}",
            metrics.cell_width,
            metrics.cell_height
        );
        self.host.font_metrics_changed(&metrics);
        self.repaint_all();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DispatchError> {
        let metrics = *self.frames.metrics();
        let size = self.frames.size();
        if !self.busy {
            draw_cursor(
                self.frames.canvas(),
                &self.grid,
                &self.highlights,
                &self.cursor,
                &metrics,
            );
        }
        draw_borders(
            self.frames.canvas(),
            &self.grid,
            &self.highlights,
            &metrics,
            size,
        );
        self.batch = BatchState::Idle;
        self.present()
    }

    fn present(&mut self) -> Result<(), DispatchError> {
        let before = *self.frames.metrics();
        match self.frames.end_draw_and_present()? {
            PresentOutcome::Recovered => {
                let metrics = *self.frames.metrics();
                if metrics != before {
                    log::info!(
                        "cell size changed to {}x{} during recovery",
                        metrics.cell_width,
                        metrics.cell_height
                    );
                    self.host.font_metrics_changed(&metrics);
                }
                log::info!("repainting full grid after surface recovery");
                self.frames.begin_draw();
                self.repaint_all();
                self.frames.end_draw_and_present()?;
            }
            PresentOutcome::Skipped => log::debug!("no open frame to present"),
            PresentOutcome::Presented | PresentOutcome::Dropped => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;
    use nvgrid_render::{DrawOp, HeadlessBackend, PixelRect, Rgb};
    use serde_json::json;

    fn renderer(strict: bool) -> GridRenderer<HeadlessBackend, RecordingHost> {
        let config = Config::new().with_dimensions(10, 4);
        let backend = HeadlessBackend::new(CellMetrics::new(8.0, 16.0));
        let mut renderer = GridRenderer::from_config(backend, RecordingHost::default(), &config)
            .unwrap();
        renderer.set_strict(strict);
        renderer.resize_surface(80, 64).unwrap();
        renderer.frames_mut().canvas().take_ops();
        renderer
    }

    #[test]
    fn grid_line_carries_highlight_between_cells() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["grid_line", [1, 2, 1, [["a", 3], ["b"], ["c", 0, 2]]]]]))
            .unwrap();
        let ids: Vec<u16> = r.grid().row(2).unwrap()[1..5].iter().map(|c| c.hl_id).collect();
        assert_eq!(ids, vec![3, 3, 0, 0]);
        assert_eq!(r.grid().row_text(2).unwrap().trim_end(), " abcc");
        assert_eq!(r.batch_state(), BatchState::Open);
    }

    #[test]
    fn flush_closes_batch_and_presents_once() {
        let mut r = renderer(true);
        let before = r.frames().present_count();
        r.handle_batch(&json!([["grid_clear", [1]], ["flush", []]]))
            .unwrap();
        assert_eq!(r.frames().present_count(), before + 1);
        assert_eq!(r.batch_state(), BatchState::Idle);
        assert!(!r.frames().draw_active());
    }

    #[test]
    fn cursor_move_erases_old_row_and_reports_ime() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["grid_cursor_goto", [1, 1, 3]]]))
            .unwrap();
        r.frames_mut().canvas().take_ops();
        r.handle_batch(&json!([["grid_cursor_goto", [1, 3, 0]]]))
            .unwrap();

        let ops = r.frames_mut().canvas().take_ops();
        let DrawOp::FillRect { rect, .. } = &ops[0] else {
            panic!("expected a row fill");
        };
        assert_eq!(rect.top, 16.0);
        assert_eq!((r.cursor().row(), r.cursor().col()), (3, 0));
        let ime = r.host().ime_position.as_ref().unwrap();
        assert_eq!(ime.rect.top, 48.0);
        assert_eq!(ime.font_family, "Consolas");
    }

    #[test]
    fn busy_cursor_is_not_drawn_at_flush() {
        let mut r = renderer(true);
        r.handle_batch(&json!([
            ["mode_info_set", [true, [{"cursor_shape": "vertical", "cell_percentage": 25, "attr_id": 0}]]],
            ["mode_change", ["insert", 0]],
            ["busy_start", []]
        ]))
        .unwrap();
        r.frames_mut().canvas().take_ops();
        r.handle_batch(&json!([["flush"]])).unwrap();

        // Only the present: no cursor sliver, no borders for an exact fit.
        assert_eq!(r.frames_mut().canvas().take_ops(), vec![DrawOp::Present]);
        assert!(r.is_busy());
    }

    #[test]
    fn scroll_redraws_moved_rows_and_cursor_rows() {
        let mut r = renderer(true);
        for row in 0..4 {
            let text = ["a", "b", "c", "d"][row];
            r.handle_batch(&json!([["grid_line", [1, row, 0, [[text, 0, 10]]]]]))
                .unwrap();
        }
        r.handle_batch(&json!([["grid_cursor_goto", [1, 3, 0]]]))
            .unwrap();
        r.frames_mut().canvas().take_ops();

        r.handle_batch(&json!([["grid_scroll", [1, 0, 4, 0, 10, 1, 0]]]))
            .unwrap();
        assert_eq!(r.grid().row_text(0).unwrap(), "bbbbbbbbbb");
        assert_eq!(r.grid().row_text(3).unwrap(), "dddddddddd");

        let redrawn: Vec<f32> = r
            .frames_mut()
            .canvas()
            .take_ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, .. } => Some(rect.top),
                _ => None,
            })
            .collect();
        assert_eq!(redrawn, vec![0.0, 16.0, 32.0, 48.0]);
    }

    #[test]
    fn title_gets_suffix() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["set_title", ["notes.md"]], ["set_title", [""]]]))
            .unwrap();
        assert_eq!(r.host().title.as_deref(), Some("nvgrid"));
        assert_eq!(r.host().title_changes, 2);
        assert_eq!(r.title(), "");
    }

    #[test]
    fn guifont_updates_metrics_and_notifies_host() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["option_set", ["guifont", "Fira_Code:h11"], ["guifont", ""]]]))
            .unwrap();
        let font = r.frames().font();
        assert_eq!(font.family, "Fira Code");
        assert_eq!(font.point_size, 11.0);
        assert_eq!(r.host().metric_changes, 1);
    }

    #[test]
    fn lenient_mode_skips_bad_events_only() {
        let mut r = renderer(false);
        let applied = r
            .handle_batch(&json!([
                ["grid_line", [1, 9, 0, [["x"]]]],
                ["hl_attr_define", [70000, {}, {}, []]],
                ["grid_scroll", [1, 0, 4, 0, 10, 0, 2]],
                ["grid_line", [1, 0, 0, [["ok"]]]],
            ]))
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(r.violation_count(), 3);
        assert_eq!(r.grid().row_text(0).unwrap().trim_end(), "ok");
    }

    #[test]
    #[should_panic(expected = "protocol violation in 'mode_change'")]
    fn strict_mode_fails_fast() {
        let mut r = renderer(true);
        let _ = r.handle_batch(&json!([["mode_change", ["normal", 3]]]));
    }

    #[test]
    fn default_colors_keep_unset_channels() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["default_colors_set", [0x112233, -1, -1, 0, 0]]]))
            .unwrap();
        let defaults = r.highlights().defaults();
        assert_eq!(defaults.foreground, Rgb(0x112233));
        assert_eq!(defaults.background, Rgb::BLACK);
    }

    fn fills(ops: &[DrawOp]) -> Vec<(PixelRect, Rgb)> {
        ops.iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }

    fn block_cursor_at(r: &mut GridRenderer<HeadlessBackend, RecordingHost>, row: usize, col: usize) {
        r.handle_batch(&json!([
            ["mode_info_set", [true, [{"cursor_shape": "block", "attr_id": 0}]]],
            ["mode_change", ["normal", 0]],
            ["grid_cursor_goto", [1, row, col]],
            ["flush"]
        ]))
        .unwrap();
        r.frames_mut().canvas().take_ops();
    }

    #[test]
    fn bad_tuple_does_not_drop_its_siblings() {
        let mut r = renderer(false);
        let applied = r
            .handle_batch(&json!([
                ["grid_line", [1, 0, 0, [["a"]]], [1, 1, "bad", [["b"]]], [1, 2, 0, [["c"]]]],
                ["flush"]
            ]))
            .unwrap();
        assert_eq!(applied, 3);
        assert_eq!(r.violation_count(), 1);
        assert_eq!(r.grid().row_text(0).unwrap().trim_end(), "a");
        assert_eq!(r.grid().row_text(1).unwrap().trim_end(), "");
        assert_eq!(r.grid().row_text(2).unwrap().trim_end(), "c");
    }

    #[test]
    fn grid_clear_fills_grid_with_default_background_at_once() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["default_colors_set", [0xffffff, 0x202020, 0xffffff, 0, 0]]]))
            .unwrap();
        r.handle_batch(&json!([["grid_line", [1, 1, 0, [["text"]]]]]))
            .unwrap();
        r.frames_mut().canvas().take_ops();

        r.handle_batch(&json!([["grid_clear", [1]]])).unwrap();
        let ops = r.frames_mut().canvas().take_ops();
        assert_eq!(
            fills(&ops),
            vec![(PixelRect::new(0.0, 0.0, 80.0, 64.0), Rgb(0x202020))]
        );
        assert!(!ops.iter().any(|op| matches!(op, DrawOp::Text(_))));
        assert_eq!(r.grid().row_text(1).unwrap().trim_end(), "");
    }

    #[test]
    fn grid_resize_draws_nothing_by_itself() {
        let mut r = renderer(true);
        r.handle_batch(&json!([["grid_resize", [1, 6, 3]]])).unwrap();
        assert_eq!((r.grid().cols(), r.grid().rows()), (6, 3));
        assert_eq!(r.frames_mut().canvas().take_ops(), vec![DrawOp::BeginFrame]);
    }

    #[test]
    fn busy_start_redraws_cursor_row_once() {
        let mut r = renderer(true);
        block_cursor_at(&mut r, 1, 3);

        r.handle_batch(&json!([["busy_start", []]])).unwrap();
        let ops = r.frames_mut().canvas().take_ops();
        let rows: Vec<PixelRect> = fills(&ops).into_iter().map(|(rect, _)| rect).collect();
        assert_eq!(rows, vec![PixelRect::new(0.0, 16.0, 80.0, 32.0)]);

        r.handle_batch(&json!([["flush"]])).unwrap();
        assert!(fills(&r.frames_mut().canvas().take_ops()).is_empty());
    }

    #[test]
    fn busy_stop_restores_cursor_at_next_flush() {
        let mut r = renderer(true);
        block_cursor_at(&mut r, 1, 3);
        r.handle_batch(&json!([["busy_start", []], ["flush"]])).unwrap();
        r.frames_mut().canvas().take_ops();

        r.handle_batch(&json!([["busy_stop", []]])).unwrap();
        assert!(fills(&r.frames_mut().canvas().take_ops()).is_empty());

        r.handle_batch(&json!([["flush"]])).unwrap();
        let rects: Vec<PixelRect> = fills(&r.frames_mut().canvas().take_ops())
            .into_iter()
            .map(|(rect, _)| rect)
            .collect();
        assert_eq!(rects, vec![PixelRect::new(24.0, 16.0, 32.0, 32.0)]);
        assert!(!r.is_busy());
    }

    #[test]
    fn recovery_with_new_cell_size_notifies_host() {
        let mut r = renderer(true);
        let changes = r.host().metric_changes;
        r.frames_mut().canvas().set_metrics(CellMetrics::new(9.0, 18.0));
        r.frames_mut()
            .canvas()
            .fail_next_present(RenderError::DeviceLost("reset".into()));
        r.handle_batch(&json!([["grid_line", [1, 0, 0, [["a"]]]], ["flush"]]))
            .unwrap();

        assert_eq!(r.frames().recovery_count(), 1);
        assert_eq!(r.host().metric_changes, changes + 1);
        assert_eq!(r.host().metrics, Some(CellMetrics::new(9.0, 18.0)));
    }

    #[test]
    fn recovery_with_same_cell_size_stays_quiet() {
        let mut r = renderer(true);
        let changes = r.host().metric_changes;
        r.frames_mut()
            .canvas()
            .fail_next_present(RenderError::DeviceLost("reset".into()));
        r.handle_batch(&json!([["flush"]])).unwrap();

        assert_eq!(r.frames().recovery_count(), 1);
        assert_eq!(r.host().metric_changes, changes);
    }
}
