//! Event store client errors

use quill_domain::{EventsError, Failure, ProtocolError};
use thiserror::Error;

use crate::connection::TransportError;

/// Errors returned by event store operations.
///
/// A failure reported for a commit is not an error; it is returned in the
/// commit result. Only fetching turns a runtime failure into an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventStoreError {
    /// Input was rejected before sending, or a response broke an invariant
    #[error(transparent)]
    Events(#[from] EventsError),

    /// The runtime response broke the protocol contract
    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    /// The call never completed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The runtime reported a failure
    #[error("Runtime failure: {0}")]
    Failure(Failure),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<ProtocolError> for EventStoreError {
    fn from(error: ProtocolError) -> Self {
        match error {
            ProtocolError::Events(events) => EventStoreError::Events(events),
            other => EventStoreError::Protocol(other),
        }
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_errors_are_not_reported_as_protocol_errors() {
        let error: EventStoreError =
            ProtocolError::Events(EventsError::EventContentNeedsToBeDefined).into();
        assert_eq!(error, EventStoreError::Events(EventsError::EventContentNeedsToBeDefined));

        let error: EventStoreError = ProtocolError::MissingEvents.into();
        assert_eq!(error, EventStoreError::Protocol(ProtocolError::MissingEvents));
    }
}
