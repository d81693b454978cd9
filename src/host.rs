//! The window the renderer draws into.
//!
//! The renderer never owns a window. Everything it needs to tell the
//! surrounding GUI goes through [`WindowHost`], which keeps the dispatcher
//! testable without a display server.

use nvgrid_render::{CellMetrics, PixelRect};

/// Where the IME composition window should appear.
#[derive(Debug, Clone, PartialEq)]
pub struct ImePosition {
    /// Pixel rectangle of the cursor cell.
    pub rect: PixelRect,
    pub font_family: String,
    /// Font height in pixels.
    pub font_height: f32,
}

/// Notifications the renderer sends to its window.
pub trait WindowHost {
    /// Full display title, suffix already applied.
    fn set_title(&mut self, title: &str);

    fn set_ime_position(&mut self, position: ImePosition);

    /// Cell size changed; the window should recompute its grid size from
    /// its pixel size and send the editor a resize request.
    fn font_metrics_changed(&mut self, metrics: &CellMetrics);
}

/// Host that only keeps the last value of each notification.
///
/// Used by the replay binary and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub title: Option<String>,
    pub ime_position: Option<ImePosition>,
    pub metrics: Option<CellMetrics>,
    pub title_changes: usize,
    pub metric_changes: usize,
}

impl WindowHost for RecordingHost {
    fn set_title(&mut self, title: &str) {
        log::debug!("window title: {title}");
        self.title = Some(title.to_string());
        self.title_changes += 1;
    }

    fn set_ime_position(&mut self, position: ImePosition) {
        log::trace!(
            "IME position ({}, {}) height {}",
            position.rect.left,
            position.rect.top,
            position.font_height
        );
        self.ime_position = Some(position);
    }

    fn font_metrics_changed(&mut self, metrics: &CellMetrics) {
        log::debug!(
            "cell metrics changed to {}x{}",
            metrics.cell_width,
            metrics.cell_height
        );
        self.metrics = Some(*metrics);
        self.metric_changes += 1;
    }
}

/// Compose the display title from the editor's title text.
pub fn compose_title(title: &str, suffix: &str) -> String {
    if title.is_empty() {
        suffix.to_string()
    } else {
        format!("{title} - {suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_shows_suffix_only() {
        assert_eq!(compose_title("", "nvgrid"), "nvgrid");
        assert_eq!(compose_title("main.rs", "nvgrid"), "main.rs - nvgrid");
    }
}
