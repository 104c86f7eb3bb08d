//! Fixtures for building contexts, events and projection requests.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use quill_domain::protocol::{encode_committed_event, WireCommittedEvent, WireUuid};
use quill_domain::{
    CallContext, CommittedEvent, EventContent, EventLogSequenceNumber, EventSourceId, EventType,
    EventTypeId, ExecutionContext, Generation, MicroserviceId, TenantId, Version,
    DEVELOPMENT_TENANT,
};
use quill_projections::protocol::{WireProjectionCurrentState, WireStreamEvent};
use quill_projections::{CurrentStateType, ProjectionRequest, ScopeId};

/// Execution context for the development tenant
pub fn execution_context() -> ExecutionContext {
    ExecutionContext::new(
        MicroserviceId::generate(),
        TenantId::from(DEVELOPMENT_TENANT),
        Version::new(1, 0, 0),
        "Development",
    )
}

/// Call context over [`execution_context`] with a fresh head
pub fn call_context() -> CallContext {
    CallContext::new(execution_context(), Uuid::now_v7())
}

/// A fresh first-generation event type
pub fn event_type() -> EventType {
    EventType::new(EventTypeId::generate(), Generation::FIRST)
}

/// A committed, non-external event carrying `content`
pub fn committed_event(
    sequence_number: u64,
    event_source_id: EventSourceId,
    event_type: &EventType,
    content: Value,
) -> CommittedEvent {
    CommittedEvent {
        event_log_sequence_number: EventLogSequenceNumber::new(sequence_number),
        occurred: Utc::now(),
        event_source_id,
        execution_context: execution_context(),
        event_type: event_type.clone(),
        content: EventContent::from(content),
        is_public: false,
        is_external: false,
        external_event_log_sequence_number: EventLogSequenceNumber::FIRST,
        external_event_received: Utc::now(),
    }
}

/// Wrap an event as read from the default scope of a partition
pub fn stream_event(event: WireCommittedEvent, partition_id: &str) -> WireStreamEvent {
    WireStreamEvent {
        event: Some(event),
        partition_id: partition_id.to_string(),
        scope_id: WireUuid::encode(ScopeId::DEFAULT),
    }
}

/// Projection request folding `event` into a state.
///
/// `state` of `None` means no state was persisted for `key`, and `initial`
/// is sent as created from the initial state.
pub fn projection_request(
    event: &CommittedEvent,
    key: &str,
    state: Option<&str>,
    initial: &str,
) -> ProjectionRequest {
    let (state_type, state) = match state {
        Some(state) => (CurrentStateType::Persisted, state),
        None => (CurrentStateType::CreatedFromInitialState, initial),
    };
    ProjectionRequest {
        current_state: Some(WireProjectionCurrentState {
            state_type,
            key: key.to_string(),
            state: state.to_string(),
        }),
        event: Some(stream_event(encode_committed_event(event), key)),
        retry_count: 0,
    }
}
