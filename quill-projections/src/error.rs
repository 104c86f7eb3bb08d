//! Projection errors

use quill_domain::{EventType, Failure, ProtocolError, TransportError};
use thiserror::Error;

use crate::identifiers::{Key, ProjectionId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The projection has no handler for an event type it received
    #[error("Projection {projection_id} has no on method for event type {event_type}")]
    MissingOnMethodForType {
        projection_id: ProjectionId,
        event_type: EventType,
    },

    /// The projection store answered with another key than requested
    #[error("Requested projection state for key '{requested}', received '{received}'")]
    WrongKeyReceived { requested: Key, received: Key },

    #[error("Invalid event content for {event_type}: {reason}")]
    InvalidEventContent { event_type: EventType, reason: String },

    /// Read model state could not be converted to or from JSON
    #[error("Invalid projection state: {0}")]
    InvalidState(String),

    #[error("Projection request is missing the current state")]
    MissingCurrentState,

    #[error("Projection request is missing the event")]
    MissingEvent,

    /// The runtime reported a failure
    #[error("Runtime failure: {0}")]
    Failure(Failure),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ProjectionError {
    /// Whether the processor can never handle requests for this projection.
    /// Fatal errors make the worker register the projection again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProjectionError::MissingOnMethodForType { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
