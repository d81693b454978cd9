//! Cursor position, mode table and the geometry/style derived from them.

use crate::error::ProtocolError;
use crate::highlight::{HighlightAttributes, HighlightFlags, HighlightTable};
use crate::layout::PixelRect;

/// Capacity of the mode-info table.
pub const MAX_CURSOR_MODE_INFOS: usize = 64;

/// How the cursor is drawn over its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    None,
    Block,
    Vertical,
    Horizontal,
}

impl CursorShape {
    /// Map the protocol's `cursor_shape` name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "block" => CursorShape::Block,
            "vertical" => CursorShape::Vertical,
            "horizontal" => CursorShape::Horizontal,
            _ => CursorShape::None,
        }
    }

    /// Part of `cell` covered by this shape; bars are `sliver` pixels thick.
    pub fn shape_rect(self, cell: PixelRect, sliver: f32) -> PixelRect {
        match self {
            CursorShape::None | CursorShape::Block => cell,
            CursorShape::Vertical => PixelRect {
                right: (cell.left + sliver).min(cell.right),
                ..cell
            },
            CursorShape::Horizontal => PixelRect {
                top: (cell.bottom - sliver).max(cell.top),
                ..cell
            },
        }
    }

    /// Whether the character under the cursor is redrawn inside it.
    pub fn draws_character(self) -> bool {
        matches!(self, CursorShape::Block)
    }
}

/// One entry of the editor's mode table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModeInfo {
    pub shape: CursorShape,
    /// Highlight id for the cursor; 0 inverts whatever is underneath.
    pub hl_id: u16,
    /// Portion of the cell the shape covers, in `0.0..=1.0`.
    pub cell_percentage: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Cursor {
    row: usize,
    col: usize,
    modes: Vec<ModeInfo>,
    active: Option<usize>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn move_to(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
    }

    /// Replace the mode table.
    pub fn set_mode_infos(&mut self, modes: Vec<ModeInfo>) -> Result<(), ProtocolError> {
        if modes.len() > MAX_CURSOR_MODE_INFOS {
            return Err(ProtocolError::TooManyModes {
                len: modes.len(),
                capacity: MAX_CURSOR_MODE_INFOS,
            });
        }
        self.modes = modes;
        Ok(())
    }

    /// Select the active mode by index into the table.
    pub fn set_mode(&mut self, index: usize) -> Result<(), ProtocolError> {
        if index >= self.modes.len() {
            return Err(ProtocolError::UnknownMode {
                index,
                len: self.modes.len(),
            });
        }
        self.active = Some(index);
        Ok(())
    }

    /// The active mode, if one has been selected and still exists.
    pub fn active_mode(&self) -> Option<&ModeInfo> {
        self.active.and_then(|index| self.modes.get(index))
    }

    pub fn modes(&self) -> &[ModeInfo] {
        &self.modes
    }

    /// Sub-rectangle of `cell` the active shape covers.
    pub fn shape_rect(&self, cell: PixelRect, sliver: f32) -> PixelRect {
        let shape = self.active_mode().map(|mode| mode.shape).unwrap_or_default();
        shape.shape_rect(cell, sliver)
    }

    /// Attribute the cursor is drawn with, given the highlight id of the
    /// character under it.
    ///
    /// With an explicit cursor highlight, its colors are used with the
    /// character's style flags. Without one (id 0), the character's own
    /// attribute is drawn with reverse toggled.
    pub fn effective_attributes(
        &self,
        table: &HighlightTable,
        under_cursor: u16,
    ) -> Option<HighlightAttributes> {
        let mode = self.active_mode()?;
        let under = table.get(under_cursor);
        let attrs = if mode.hl_id == 0 {
            HighlightAttributes {
                flags: under.flags ^ HighlightFlags::REVERSE,
                ..*under
            }
        } else {
            HighlightAttributes {
                flags: under.flags,
                ..*table.get(mode.hl_id)
            }
        };
        Some(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::highlight::{DefaultColors, HighlightUpdate};

    fn modes() -> Vec<ModeInfo> {
        vec![
            ModeInfo {
                shape: CursorShape::Block,
                hl_id: 0,
                cell_percentage: 0.0,
            },
            ModeInfo {
                shape: CursorShape::Vertical,
                hl_id: 9,
                cell_percentage: 0.25,
            },
            ModeInfo {
                shape: CursorShape::Horizontal,
                hl_id: 0,
                cell_percentage: 0.2,
            },
        ]
    }

    #[test]
    fn shape_names_map_to_variants() {
        assert_eq!(CursorShape::from_name("block"), CursorShape::Block);
        assert_eq!(CursorShape::from_name("vertical"), CursorShape::Vertical);
        assert_eq!(CursorShape::from_name("horizontal"), CursorShape::Horizontal);
        assert_eq!(CursorShape::from_name("triangle"), CursorShape::None);
    }

    #[test]
    fn shape_rects() {
        let cell = PixelRect::new(10.0, 20.0, 20.0, 40.0);
        assert_eq!(CursorShape::Block.shape_rect(cell, 2.0), cell);
        assert_eq!(CursorShape::None.shape_rect(cell, 2.0), cell);
        assert_eq!(
            CursorShape::Vertical.shape_rect(cell, 2.0),
            PixelRect::new(10.0, 20.0, 12.0, 40.0)
        );
        assert_eq!(
            CursorShape::Horizontal.shape_rect(cell, 2.0),
            PixelRect::new(10.0, 38.0, 20.0, 40.0)
        );
    }

    #[test]
    fn set_mode_selects_from_table() {
        let mut cursor = Cursor::new();
        assert!(cursor.active_mode().is_none());
        cursor.set_mode_infos(modes()).unwrap();
        cursor.set_mode(1).unwrap();
        assert_eq!(cursor.active_mode().unwrap().shape, CursorShape::Vertical);
        assert_eq!(
            cursor.set_mode(3),
            Err(ProtocolError::UnknownMode { index: 3, len: 3 })
        );
        // A failed selection keeps the previous mode.
        assert_eq!(cursor.active_mode().unwrap().hl_id, 9);
    }

    #[test]
    fn oversized_mode_table_is_rejected() {
        let mut cursor = Cursor::new();
        cursor.set_mode_infos(modes()).unwrap();
        let too_many = vec![ModeInfo::default(); MAX_CURSOR_MODE_INFOS + 1];
        assert!(matches!(
            cursor.set_mode_infos(too_many),
            Err(ProtocolError::TooManyModes { .. })
        ));
        assert_eq!(cursor.modes().len(), 3);
    }

    #[test]
    fn shrinking_table_drops_active_mode() {
        let mut cursor = Cursor::new();
        cursor.set_mode_infos(modes()).unwrap();
        cursor.set_mode(2).unwrap();
        cursor.set_mode_infos(modes()[..1].to_vec()).unwrap();
        assert!(cursor.active_mode().is_none());
    }

    #[test]
    fn default_cursor_inverts_character_attribute() {
        let mut table = HighlightTable::new();
        table.set_default_colors(DefaultColors {
            foreground: Rgb::WHITE,
            background: Rgb::BLACK,
            special: Rgb::WHITE,
        });
        table.define(
            2,
            &HighlightUpdate {
                foreground: Some(Rgb(0x00ff00)),
                set: HighlightFlags::BOLD,
                ..Default::default()
            },
        );

        let mut cursor = Cursor::new();
        cursor.set_mode_infos(modes()).unwrap();
        cursor.set_mode(0).unwrap();

        let attrs = cursor.effective_attributes(&table, 2).unwrap();
        assert_eq!(attrs.flags, HighlightFlags::BOLD | HighlightFlags::REVERSE);
        assert_eq!(table.resolve_background_of(&attrs), Rgb(0x00ff00));
        assert_eq!(table.resolve_foreground_of(&attrs), Rgb::BLACK);
    }

    #[test]
    fn explicit_cursor_highlight_keeps_character_flags() {
        let mut table = HighlightTable::new();
        table.define(
            9,
            &HighlightUpdate {
                background: Some(Rgb(0xff8800)),
                set: HighlightFlags::UNDERLINE,
                ..Default::default()
            },
        );
        table.define(
            3,
            &HighlightUpdate {
                set: HighlightFlags::ITALIC,
                ..Default::default()
            },
        );

        let mut cursor = Cursor::new();
        cursor.set_mode_infos(modes()).unwrap();
        cursor.set_mode(1).unwrap();

        let attrs = cursor.effective_attributes(&table, 3).unwrap();
        assert_eq!(attrs.flags, HighlightFlags::ITALIC);
        assert_eq!(attrs.background, Some(Rgb(0xff8800)));
    }
}
