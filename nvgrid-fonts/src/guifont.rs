//! Parser for the editor's `guifont` option value.
//!
//! The accepted form is `Family Name:h12.5[:other options]`. Only the first
//! comma-separated entry is used, underscores in the family read as spaces,
//! and options other than `h` are ignored.

/// A parsed `guifont` value.
#[derive(Debug, Clone, PartialEq)]
pub struct GuiFont {
    /// Requested family; `None` keeps the current family.
    pub family: Option<String>,
    /// Point size; the default size when `:h` is absent or unparseable.
    pub point_size: f32,
}

impl GuiFont {
    /// Parse a `guifont` value. Returns `None` for an empty value, which
    /// the editor sends to mean "use the GUI's default".
    pub fn parse(value: &str, default_size: f32) -> Option<Self> {
        let entry = value.split(',').next().unwrap_or("").trim();
        if entry.is_empty() {
            return None;
        }

        let (name, options) = match entry.split_once(':') {
            Some((name, options)) => (name, Some(options)),
            None => (entry, None),
        };

        let family = name.trim().replace('_', " ");
        let family = (!family.is_empty()).then_some(family);

        let point_size = options
            .and_then(|options| options.split(':').find_map(|opt| opt.strip_prefix('h')))
            .and_then(|size| size.trim().parse::<f32>().ok())
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(default_size);

        Some(Self { family, point_size })
    }
}
