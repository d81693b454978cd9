// Library exports for the replay binary and integration tests.
//
// The grid model, compositor and presentation backends live in
// `nvgrid-render`; this crate decodes redraw payloads and drives them.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod debug;
pub mod error;
pub mod events;
pub mod host;
pub mod renderer;
pub mod replay;

pub use error::DispatchError;
pub use events::{EventError, LineCell, RedrawEvent, decode_batch, decode_event, decode_tuples};
pub use host::{ImePosition, RecordingHost, WindowHost, compose_title};
pub use renderer::{BatchState, GridRenderer, RendererOptions};
