//! Typed errors for font resolution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    /// Neither the requested family, the default family nor any generic
    /// monospace face is installed.
    #[error("no usable font found (requested '{requested}')")]
    NoUsableFont { requested: String },

    /// The font resolved but its tables cannot produce cell metrics.
    #[error("font '{family}' has no usable metrics")]
    InvalidMetrics { family: String },
}
