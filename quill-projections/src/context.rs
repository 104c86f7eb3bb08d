//! Contexts passed to projection handlers

use chrono::{DateTime, Utc};

use quill_domain::{EventLogSequenceNumber, EventSourceId, ExecutionContext};

use crate::identifiers::Key;

/// Where an event came from
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub sequence_number: EventLogSequenceNumber,
    pub event_source_id: EventSourceId,
    pub occurred: DateTime<Utc>,
    pub execution_context: ExecutionContext,
}

/// What a projection handler is folding into
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionContext {
    /// The state is the projection's initial state, not a persisted one
    pub was_created_from_initial_state: bool,
    pub key: Key,
    pub event_context: EventContext,
}
