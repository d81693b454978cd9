//! Error type for redraw dispatch.

use thiserror::Error;

use nvgrid_render::{ProtocolError, RenderError};

use crate::events::EventError;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload could not be decoded into an event.
    #[error(transparent)]
    Event(#[from] EventError),

    /// The event broke a grid, highlight or cursor invariant.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Presentation failed and could not be recovered.
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl DispatchError {
    /// Whether this error is the editor's fault rather than ours.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, DispatchError::Event(_) | DispatchError::Protocol(_))
    }
}
