//! Family lists consulted when the requested font is unavailable or lacks a glyph.

/// Monospace families tried, in order, when neither the requested family nor
/// the default family is installed.
pub const MONOSPACE_FAMILIES: &[&str] = &[
    "Cascadia Mono",
    "JetBrains Mono",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
    "Menlo",
    "Monaco",
    "Courier New",
];

/// Fallback font families in priority order.
///
/// These fonts are searched in order when the primary font doesn't have a
/// glyph: CJK first, then monochrome symbols, then colour emoji.
pub const FALLBACK_FAMILIES: &[&str] = &[
    // CJK fonts
    "Noto Sans CJK JP",
    "Noto Sans CJK SC",
    "Microsoft YaHei",
    "MS Gothic",
    "Malgun Gothic",
    // Monochrome symbol fonts
    "Symbols Nerd Font",
    "Segoe UI Symbol",
    "Apple Symbols",
    "Noto Sans Symbols 2",
    "DejaVu Sans",
    // Color emoji fonts
    "Noto Color Emoji",
    "Apple Color Emoji",
    "Segoe UI Emoji",
];
