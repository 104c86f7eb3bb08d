//! Domain errors for event construction and validation

use crate::identifiers::{AggregateRootId, EventSourceId};
use crate::versions::{AggregateRootVersion, EventLogSequenceNumber};

/// Errors raised while building or validating events.
///
/// Every variant is fatal to the call that produced it. None of them are
/// retried by the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventsError {
    /// Sequence number was negative or not a whole number
    #[error("Invalid event log sequence number: {0}")]
    InvalidSequenceNumber(String),

    /// Aggregate root version was negative or not a whole number
    #[error("Invalid aggregate root version: {0}")]
    InvalidAggregateRootVersion(String),

    /// Event content was null
    #[error("Event content needs to be defined")]
    EventContentNeedsToBeDefined,

    /// Event log sequence numbers were not strictly increasing
    #[error(
        "Event log sequence number is out of order: {current} does not come after {previous}"
    )]
    EventLogSequenceNumberIsOutOfOrder {
        /// Sequence number of the offending event
        current: EventLogSequenceNumber,
        /// Sequence number of the event before it
        previous: EventLogSequenceNumber,
    },

    /// An aggregate event belongs to a different event source
    #[error("Event was applied to event source {event_source_id}, expected {expected}")]
    EventWasAppliedToOtherEventSource {
        /// Event source the event carries
        event_source_id: EventSourceId,
        /// Event source the sequence was declared for
        expected: EventSourceId,
    },

    /// An aggregate event was applied by a different aggregate root
    #[error("Event was applied by aggregate root {aggregate_root_id}, expected {expected}")]
    EventWasAppliedByOtherAggregateRoot {
        /// Aggregate root the event carries
        aggregate_root_id: AggregateRootId,
        /// Aggregate root the sequence was declared for
        expected: AggregateRootId,
    },

    /// Aggregate root versions were not contiguous
    #[error("Aggregate root version is out of order: got {actual}, expected {expected}")]
    AggregateRootVersionIsOutOfOrder {
        /// Version the event carries
        actual: AggregateRootVersion,
        /// Version the sequence expected next
        expected: AggregateRootVersion,
    },

    /// Explicit event types did not line up with the event contents
    #[error("Got {events} events but {event_types} event types")]
    EventTypesCountMismatch {
        /// Number of event contents
        events: usize,
        /// Number of explicit event types
        event_types: usize,
    },

    /// No event type is registered for the content's Rust type
    #[error("No event type registered for {0}")]
    UnknownEventType(String),

    /// A Rust type or event type was registered twice
    #[error("Event type already registered: {0}")]
    EventTypeAlreadyRegistered(String),

    /// Content could not be turned into JSON
    #[error("Event content could not be serialized: {0}")]
    EventContentCouldNotBeSerialized(String),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, EventsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_out_of_order_message_names_both_numbers() {
        let err = EventsError::EventLogSequenceNumberIsOutOfOrder {
            current: EventLogSequenceNumber::new(3),
            previous: EventLogSequenceNumber::new(7),
        };

        let message = err.to_string();
        assert!(message.contains('3'));
        assert!(message.contains('7'));
    }

    #[test]
    fn test_other_event_source_message() {
        let actual = EventSourceId::from(Uuid::now_v7());
        let expected = EventSourceId::from(Uuid::now_v7());
        let err = EventsError::EventWasAppliedToOtherEventSource {
            event_source_id: actual,
            expected,
        };

        assert!(err.to_string().contains(&expected.to_string()));
    }
}
