//! Highlight attribute table.
//!
//! Entries are indexed by the id cells carry. Id 0 is the default
//! attribute: its colors come from `default_colors_set` and every other
//! entry falls back to them for channels it leaves unset.

use bitflags::bitflags;

use crate::color::Rgb;
use crate::error::ProtocolError;

/// Number of addressable highlight ids; every `u16` id fits.
pub const MAX_HIGHLIGHT_ATTRIBS: usize = u16::MAX as usize + 1;

bitflags! {
    /// Style flags of a highlight attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HighlightFlags: u8 {
        const REVERSE = 1 << 0;
        const ITALIC = 1 << 1;
        const BOLD = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const UNDERLINE = 1 << 4;
        const UNDERCURL = 1 << 5;
    }
}

/// One table entry. `None` colors mean "use the default attribute's".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightAttributes {
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
    pub special: Option<Rgb>,
    pub flags: HighlightFlags,
}

/// Payload of an attribute definition.
///
/// Colors absent here reset to the default; flags are only changed when
/// they appear in `set` or `unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightUpdate {
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
    pub special: Option<Rgb>,
    pub set: HighlightFlags,
    pub unset: HighlightFlags,
}

/// Colors of the default attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultColors {
    pub foreground: Rgb,
    pub background: Rgb,
    pub special: Rgb,
}

impl Default for DefaultColors {
    fn default() -> Self {
        Self {
            foreground: Rgb::WHITE,
            background: Rgb::BLACK,
            special: Rgb::WHITE,
        }
    }
}

/// Fixed-capacity table of highlight attributes.
#[derive(Debug, Clone)]
pub struct HighlightTable {
    entries: Vec<HighlightAttributes>,
    defaults: DefaultColors,
}

impl Default for HighlightTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightTable {
    pub fn new() -> Self {
        Self {
            entries: vec![HighlightAttributes::default(); MAX_HIGHLIGHT_ATTRIBS],
            defaults: DefaultColors::default(),
        }
    }

    /// Convert a protocol id into a table index.
    pub fn checked_id(id: u64) -> Result<u16, ProtocolError> {
        u16::try_from(id).map_err(|_| ProtocolError::HighlightId {
            id,
            capacity: MAX_HIGHLIGHT_ATTRIBS,
        })
    }

    pub fn get(&self, id: u16) -> &HighlightAttributes {
        &self.entries[id as usize]
    }

    pub fn defaults(&self) -> DefaultColors {
        self.defaults
    }

    /// Apply an attribute definition to `id`.
    ///
    /// Id 0 is the default attribute: its colors never live in the entry,
    /// they replace the matching default colors, so every id that falls
    /// back to a default picks them up. Its flags are kept as usual.
    pub fn define(&mut self, id: u16, update: &HighlightUpdate) {
        if id == 0 {
            let defaults = &mut self.defaults;
            defaults.foreground = update.foreground.unwrap_or(defaults.foreground);
            defaults.background = update.background.unwrap_or(defaults.background);
            defaults.special = update.special.unwrap_or(defaults.special);
        }
        let entry = &mut self.entries[id as usize];
        if id != 0 {
            entry.foreground = update.foreground;
            entry.background = update.background;
            entry.special = update.special;
        }
        entry.flags.insert(update.set);
        entry.flags.remove(update.unset);
    }

    /// Set the default colors and reset id 0 to plain defaults.
    pub fn set_default_colors(&mut self, colors: DefaultColors) {
        self.defaults = colors;
        self.entries[0] = HighlightAttributes::default();
    }

    pub fn flags(&self, id: u16) -> HighlightFlags {
        self.get(id).flags
    }

    /// Foreground after the reverse-video rule and default fallback.
    pub fn resolve_foreground(&self, id: u16) -> Rgb {
        self.resolve_foreground_of(self.get(id))
    }

    /// Background after the reverse-video rule and default fallback.
    pub fn resolve_background(&self, id: u16) -> Rgb {
        self.resolve_background_of(self.get(id))
    }

    pub fn resolve_special(&self, id: u16) -> Rgb {
        self.get(id).special.unwrap_or(self.defaults.special)
    }

    /// Same as [`resolve_foreground`](Self::resolve_foreground) for an
    /// attribute that is not in the table, such as a cursor's effective
    /// attribute.
    pub fn resolve_foreground_of(&self, attrs: &HighlightAttributes) -> Rgb {
        if attrs.flags.contains(HighlightFlags::REVERSE) {
            attrs.background.unwrap_or(self.defaults.background)
        } else {
            attrs.foreground.unwrap_or(self.defaults.foreground)
        }
    }

    pub fn resolve_background_of(&self, attrs: &HighlightAttributes) -> Rgb {
        if attrs.flags.contains(HighlightFlags::REVERSE) {
            attrs.foreground.unwrap_or(self.defaults.foreground)
        } else {
            attrs.background.unwrap_or(self.defaults.background)
        }
    }

    pub fn resolve_special_of(&self, attrs: &HighlightAttributes) -> Rgb {
        attrs.special.unwrap_or(self.defaults.special)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HighlightTable {
        let mut table = HighlightTable::new();
        table.set_default_colors(DefaultColors {
            foreground: Rgb(0xd0d0d0),
            background: Rgb(0x101010),
            special: Rgb(0xff0000),
        });
        table
    }

    #[test]
    fn unset_foreground_falls_back_to_default() {
        let mut table = table();
        table.define(
            3,
            &HighlightUpdate {
                background: Some(Rgb(0x223344)),
                ..Default::default()
            },
        );
        assert_eq!(table.resolve_foreground(3), Rgb(0xd0d0d0));
        assert_eq!(table.resolve_background(3), Rgb(0x223344));
        assert_eq!(table.resolve_special(3), Rgb(0xff0000));
    }

    #[test]
    fn defining_id_zero_sets_default_colors() {
        let mut table = table();
        table.define(
            0,
            &HighlightUpdate {
                foreground: Some(Rgb(0xaa0000)),
                set: HighlightFlags::BOLD,
                ..Default::default()
            },
        );
        assert_eq!(table.get(0).foreground, None);
        assert_eq!(table.defaults().foreground, Rgb(0xaa0000));
        assert_eq!(table.defaults().background, Rgb(0x101010));
        assert_eq!(table.resolve_foreground(0), Rgb(0xaa0000));
        assert_eq!(table.resolve_foreground(7), Rgb(0xaa0000));
        assert_eq!(table.flags(0), HighlightFlags::BOLD);
    }

    #[test]
    fn reverse_swaps_channels() {
        let mut table = table();
        table.define(
            4,
            &HighlightUpdate {
                foreground: Some(Rgb(0xaaaaaa)),
                set: HighlightFlags::REVERSE,
                ..Default::default()
            },
        );
        // Own background is unset, so the default background is used.
        assert_eq!(table.resolve_foreground(4), Rgb(0x101010));
        assert_eq!(table.resolve_background(4), Rgb(0xaaaaaa));

        table.define(
            4,
            &HighlightUpdate {
                background: Some(Rgb(0x445566)),
                ..Default::default()
            },
        );
        // Reverse survives because flags were not mentioned.
        assert_eq!(table.resolve_foreground(4), Rgb(0x445566));
        assert_eq!(table.resolve_background(4), Rgb(0xd0d0d0));
    }

    #[test]
    fn flags_accumulate_but_colors_reset() {
        let mut table = table();
        table.define(
            5,
            &HighlightUpdate {
                foreground: Some(Rgb(0x00ff00)),
                set: HighlightFlags::BOLD,
                ..Default::default()
            },
        );
        table.define(
            5,
            &HighlightUpdate {
                set: HighlightFlags::ITALIC,
                ..Default::default()
            },
        );
        assert_eq!(
            table.flags(5),
            HighlightFlags::BOLD | HighlightFlags::ITALIC
        );
        assert_eq!(table.get(5).foreground, None);
        assert_eq!(table.resolve_foreground(5), Rgb(0xd0d0d0));
    }

    #[test]
    fn explicit_false_clears_flag() {
        let mut table = table();
        table.define(
            6,
            &HighlightUpdate {
                set: HighlightFlags::BOLD | HighlightFlags::UNDERLINE,
                ..Default::default()
            },
        );
        table.define(
            6,
            &HighlightUpdate {
                unset: HighlightFlags::BOLD,
                ..Default::default()
            },
        );
        assert_eq!(table.flags(6), HighlightFlags::UNDERLINE);
    }

    #[test]
    fn default_colors_clear_id_zero_flags() {
        let mut table = table();
        table.define(
            0,
            &HighlightUpdate {
                set: HighlightFlags::BOLD,
                ..Default::default()
            },
        );
        table.set_default_colors(DefaultColors {
            foreground: Rgb::WHITE,
            background: Rgb::BLACK,
            special: Rgb::BLACK,
        });
        assert!(table.flags(0).is_empty());
        assert_eq!(table.resolve_foreground(0), Rgb::WHITE);
        assert_eq!(table.resolve_background(0), Rgb::BLACK);
    }

    #[test]
    fn ids_beyond_u16_are_rejected() {
        assert_eq!(HighlightTable::checked_id(65535), Ok(65535));
        assert!(matches!(
            HighlightTable::checked_id(65536),
            Err(ProtocolError::HighlightId { id: 65536, .. })
        ));
    }
}
