//! Owned font data.

use std::sync::Arc;

use swash::{CacheKey, FontRef};

/// Font bytes plus the location of one face inside them.
///
/// The bytes are shared, so cloning is cheap. A `FontRef` borrowing the
/// bytes is rebuilt on demand by [`FontData::font_ref`].
#[derive(Clone)]
pub struct FontData {
    data: Arc<Vec<u8>>,
    offset: u32,
    key: CacheKey,
}

impl std::fmt::Debug for FontData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontData")
            .field("data_len", &self.data.len())
            .field("offset", &self.offset)
            .finish()
    }
}

impl FontData {
    /// Create a new FontData from bytes with a specific face index.
    ///
    /// Returns `None` if the bytes do not contain a valid face at `face_index`.
    pub fn new_with_index(data: Vec<u8>, face_index: usize) -> Option<Self> {
        let data = Arc::new(data);
        let font = FontRef::from_index(data.as_slice(), face_index)?;
        let (offset, key) = (font.offset, font.key);
        Some(Self { data, offset, key })
    }

    /// Borrow the face for glyph lookups and rasterization.
    pub fn font_ref(&self) -> FontRef<'_> {
        FontRef {
            data: self.data.as_slice(),
            offset: self.offset,
            key: self.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FontData;

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(FontData::new_with_index(vec![0u8; 64], 0).is_none());
        assert!(FontData::new_with_index(Vec::new(), 0).is_none());
    }
}
