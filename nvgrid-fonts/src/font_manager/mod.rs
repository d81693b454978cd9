//! Font management with a fixed default family and a fallback chain.
//!
//! Resolution order for the primary face:
//! 1. the requested family
//! 2. the configured default family (`Consolas`)
//! 3. common monospace families ([`MONOSPACE_FAMILIES`])
//! 4. the database's generic monospace face
//!
//! Glyph lookup tries the styled face first, then the regular face, then
//! [`FALLBACK_FAMILIES`].

mod fallbacks;
mod loader;
mod types;

use fontdb::{Database, Style, Weight};
use nvgrid_config::defaults::FALLBACK_FONT_FAMILY;
use swash::FontRef;

use crate::error::FontError;
use crate::metrics::{FontMetrics, FontRequest, RawFontMetrics};

pub use fallbacks::{FALLBACK_FAMILIES, MONOSPACE_FAMILIES};
pub use types::FontData;

/// Index of the first fallback font; 0..=3 are the styled primary faces.
const FALLBACK_START: usize = 4;

/// Manages the primary face, its styled variants and the fallback chain.
///
/// Font indices are assigned as follows:
/// - 0: Primary/regular font
/// - 1: Bold font (if available)
/// - 2: Italic font (if available)
/// - 3: Bold-italic font (if available)
/// - 4..: Fallback fonts
pub struct FontManager {
    /// Family name the primary face resolved to
    family: String,
    primary: FontData,
    bold: Option<FontData>,
    italic: Option<FontData>,
    bold_italic: Option<FontData>,
    fallbacks: Vec<FontData>,
    font_db: Database,
}

impl std::fmt::Debug for FontManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontManager")
            .field("family", &self.family)
            .field("fallbacks", &self.fallbacks.len())
            .finish()
    }
}

impl FontManager {
    /// Create a FontManager from the installed system fonts.
    pub fn new(requested_family: &str) -> Result<Self, FontError> {
        let mut font_db = Database::new();
        font_db.load_system_fonts();
        log::info!("Loaded {} system fonts", font_db.len());
        Self::with_database(font_db, requested_family)
    }

    /// Create a FontManager over an already populated database.
    pub fn with_database(font_db: Database, requested_family: &str) -> Result<Self, FontError> {
        let (family, primary) = Self::resolve_primary(&font_db, requested_family)?;
        let fallbacks = Self::build_fallback_chain(&font_db, &family);
        log::info!("Loaded {} fallback fonts", fallbacks.len());

        let mut manager = FontManager {
            family,
            primary,
            bold: None,
            italic: None,
            bold_italic: None,
            fallbacks,
            font_db,
        };
        manager.load_styled_variants();
        Ok(manager)
    }

    /// Switch the primary family, reusing the loaded database.
    ///
    /// On failure the current faces stay in place.
    pub fn set_family(&mut self, requested_family: &str) -> Result<(), FontError> {
        if requested_family == self.family {
            return Ok(());
        }
        let (family, primary) = Self::resolve_primary(&self.font_db, requested_family)?;
        self.fallbacks = Self::build_fallback_chain(&self.font_db, &family);
        self.family = family;
        self.primary = primary;
        self.load_styled_variants();
        Ok(())
    }

    /// Family name the primary face resolved to.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Compute cell metrics for the primary face at the requested size.
    pub fn metrics(&self, request: &FontRequest) -> Result<FontMetrics, FontError> {
        let raw = RawFontMetrics::from_font(self.primary.font_ref()).ok_or_else(|| {
            FontError::InvalidMetrics {
                family: self.family.clone(),
            }
        })?;
        Ok(FontMetrics::compute(&raw, request))
    }

    /// Get a face by index (see the struct docs for the numbering).
    pub fn get_font(&self, font_index: usize) -> Option<FontRef<'_>> {
        match font_index {
            0 => Some(self.primary.font_ref()),
            1 => self.bold.as_ref().map(FontData::font_ref),
            2 => self.italic.as_ref().map(FontData::font_ref),
            3 => self.bold_italic.as_ref().map(FontData::font_ref),
            n => self.fallbacks.get(n - FALLBACK_START).map(FontData::font_ref),
        }
    }

    /// Find a glyph for a character across the font fallback chain.
    ///
    /// Returns `(font_index, glyph_id)`.
    pub fn find_glyph(&self, character: char, bold: bool, italic: bool) -> Option<(usize, u16)> {
        let styled = match (bold, italic) {
            (true, true) => self.bold_italic.as_ref().map(|f| (3, f)),
            (true, false) => self.bold.as_ref().map(|f| (1, f)),
            (false, true) => self.italic.as_ref().map(|f| (2, f)),
            (false, false) => None,
        };
        if let Some((index, font)) = styled {
            let glyph_id = font.font_ref().charmap().map(character);
            if glyph_id != 0 {
                return Some((index, glyph_id));
            }
        }

        let glyph_id = self.primary.font_ref().charmap().map(character);
        if glyph_id != 0 {
            return Some((0, glyph_id));
        }

        for (idx, fallback) in self.fallbacks.iter().enumerate() {
            let glyph_id = fallback.font_ref().charmap().map(character);
            if glyph_id != 0 {
                log::debug!(
                    "Character '{}' (U+{:04X}) found in fallback font index {}",
                    character,
                    character as u32,
                    FALLBACK_START + idx
                );
                return Some((FALLBACK_START + idx, glyph_id));
            }
        }

        log::debug!(
            "Character '{}' (U+{:04X}) not found in any font",
            character,
            character as u32
        );
        None
    }

    fn resolve_primary(
        font_db: &Database,
        requested_family: &str,
    ) -> Result<(String, FontData), FontError> {
        let requested = requested_family.trim();
        if !requested.is_empty() {
            if let Some(font) =
                loader::load_font_from_db(font_db, requested, Weight::NORMAL, Style::Normal)
            {
                log::info!("Loaded primary font: {}", requested);
                return Ok((requested.to_string(), font));
            }
            log::warn!(
                "Font '{}' not found, falling back to {}",
                requested,
                FALLBACK_FONT_FAMILY
            );
        }

        let candidates = std::iter::once(FALLBACK_FONT_FAMILY).chain(MONOSPACE_FAMILIES.iter().copied());
        for family in candidates {
            if let Some(font) =
                loader::load_font_from_db(font_db, family, Weight::NORMAL, Style::Normal)
            {
                log::info!("Loaded primary font: {}", family);
                return Ok((family.to_string(), font));
            }
        }

        loader::load_generic_monospace(font_db)
            .inspect(|(family, _)| log::info!("Using generic monospace font: {}", family))
            .ok_or_else(|| FontError::NoUsableFont {
                requested: requested.to_string(),
            })
    }

    fn load_styled_variants(&mut self) {
        let family = self.family.clone();
        self.bold = loader::load_font_from_db(&self.font_db, &family, Weight::BOLD, Style::Normal);
        self.italic =
            loader::load_font_from_db(&self.font_db, &family, Weight::NORMAL, Style::Italic);
        self.bold_italic =
            loader::load_font_from_db(&self.font_db, &family, Weight::BOLD, Style::Italic);
        log::debug!(
            "Styled variants for {}: bold={} italic={} bold_italic={}",
            family,
            self.bold.is_some(),
            self.italic.is_some(),
            self.bold_italic.is_some()
        );
    }

    fn build_fallback_chain(font_db: &Database, primary_family: &str) -> Vec<FontData> {
        FALLBACK_FAMILIES
            .iter()
            .filter(|family| !family.eq_ignore_ascii_case(primary_family))
            .filter_map(|family| {
                let font = loader::load_font_from_db(font_db, family, Weight::NORMAL, Style::Normal);
                if font.is_some() {
                    log::debug!("Added fallback font: {}", family);
                }
                font
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_database_has_no_usable_font() {
        let err = FontManager::with_database(Database::new(), "Nope Mono").unwrap_err();
        match err {
            FontError::NoUsableFont { requested } => assert_eq!(requested, "Nope Mono"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
