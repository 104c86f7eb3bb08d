//! Event store requests and responses
//!
//! Message shapes for the three event store calls. Requests are built from
//! uncommitted containers, resolving every event type against the registry
//! before anything leaves the process.

use serde::{Deserialize, Serialize};

use quill_domain::protocol::{
    encode_content, WireCallContext, WireCommittedAggregateEvents, WireCommittedEvent,
    WireEventType, WireFailure, WireUuid,
};
use quill_domain::{
    AggregateRootId, CallContext, EventSourceId, EventTypes, EventsError,
    UncommittedAggregateEvents, UncommittedEvents,
};

// =============================================================================
// Commit
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUncommittedEvent {
    pub event_source_id: WireUuid,
    pub event_type: Option<WireEventType>,
    pub content: String,
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEventsRequest {
    pub call_context: Option<WireCallContext>,
    pub events: Vec<WireUncommittedEvent>,
}

impl CommitEventsRequest {
    /// Build a request, resolving event types through the registry.
    ///
    /// # Errors
    /// Returns `EventsError::EventContentNeedsToBeDefined` or
    /// `EventsError::UnknownEventType` before any I/O happens.
    pub fn new(
        call_context: &CallContext,
        events: &UncommittedEvents,
        event_types: &EventTypes,
    ) -> Result<Self, EventsError> {
        events.validate()?;
        let events = events
            .iter()
            .map(|event| {
                let event_type = event.event_type.resolve(event_types)?;
                Ok(WireUncommittedEvent {
                    event_source_id: WireUuid::encode(event.event_source_id),
                    event_type: Some((&event_type).into()),
                    content: encode_content(&event.content),
                    public: event.is_public,
                })
            })
            .collect::<Result<Vec<_>, EventsError>>()?;

        Ok(Self {
            call_context: Some(call_context.into()),
            events,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEventsResponse {
    pub failure: Option<WireFailure>,
    pub events: Vec<WireCommittedEvent>,
}

// =============================================================================
// Commit for aggregate
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUncommittedAggregateEvent {
    pub event_type: Option<WireEventType>,
    pub content: String,
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireUncommittedAggregateEvents {
    pub event_source_id: WireUuid,
    pub aggregate_root_id: WireUuid,
    pub expected_aggregate_root_version: u64,
    pub events: Vec<WireUncommittedAggregateEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAggregateEventsRequest {
    pub call_context: Option<WireCallContext>,
    pub events: Option<WireUncommittedAggregateEvents>,
}

impl CommitAggregateEventsRequest {
    /// Build a request, resolving event types through the registry.
    ///
    /// # Errors
    /// Returns `EventsError::UnknownEventType` before any I/O happens.
    pub fn new(
        call_context: &CallContext,
        events: &UncommittedAggregateEvents,
        event_types: &EventTypes,
    ) -> Result<Self, EventsError> {
        let wire_events = events
            .iter()
            .map(|event| {
                let event_type = event.event_type.resolve(event_types)?;
                Ok(WireUncommittedAggregateEvent {
                    event_type: Some((&event_type).into()),
                    content: encode_content(&event.content),
                    public: event.is_public,
                })
            })
            .collect::<Result<Vec<_>, EventsError>>()?;

        Ok(Self {
            call_context: Some(call_context.into()),
            events: Some(WireUncommittedAggregateEvents {
                event_source_id: WireUuid::encode(events.event_source_id()),
                aggregate_root_id: WireUuid::encode(events.aggregate_root_id()),
                expected_aggregate_root_version: events.expected_aggregate_root_version().value(),
                events: wire_events,
            }),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAggregateEventsResponse {
    pub failure: Option<WireFailure>,
    pub events: Option<WireCommittedAggregateEvents>,
}

// =============================================================================
// Fetch for aggregate
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAggregate {
    pub aggregate_root_id: WireUuid,
    pub event_source_id: WireUuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchForAggregateRequest {
    pub call_context: Option<WireCallContext>,
    pub aggregate: Option<WireAggregate>,
}

impl FetchForAggregateRequest {
    pub fn new(
        call_context: &CallContext,
        aggregate_root_id: AggregateRootId,
        event_source_id: EventSourceId,
    ) -> Self {
        Self {
            call_context: Some(call_context.into()),
            aggregate: Some(WireAggregate {
                aggregate_root_id: WireUuid::encode(aggregate_root_id),
                event_source_id: WireUuid::encode(event_source_id),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchForAggregateResponse {
    pub failure: Option<WireFailure>,
    pub events: Option<WireCommittedAggregateEvents>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_domain::{
        ContentType, EventType, EventTypeId, ExecutionContext, Generation, MicroserviceId,
        TenantId, UncommittedAggregateEvent, UncommittedEvent, Version, DEVELOPMENT_TENANT,
    };
    use serde_json::json;
    use uuid::Uuid;

    fn call_context() -> CallContext {
        CallContext::new(
            ExecutionContext::new(
                MicroserviceId::generate(),
                TenantId::from(DEVELOPMENT_TENANT),
                Version::new(1, 0, 0),
                "Development",
            ),
            Uuid::new_v4(),
        )
    }

    struct DishPrepared;

    #[test]
    fn test_unknown_event_type_is_rejected_before_sending() {
        let event = UncommittedEvent {
            content: json!({"dish": "Taco"}),
            event_source_id: EventSourceId::generate(),
            event_type: quill_domain::EventTypeReference::Inferred(
                ContentType::of::<DishPrepared>(),
            ),
            is_public: false,
        };

        let result = CommitEventsRequest::new(
            &call_context(),
            &UncommittedEvents::from(event),
            &EventTypes::new(),
        );
        assert!(matches!(result, Err(EventsError::UnknownEventType(_))));
    }

    #[test]
    fn test_commit_request_carries_resolved_types() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let event = UncommittedEvent::new(
            json!({"dish": "Taco"}),
            EventSourceId::generate(),
            event_type.clone(),
        )
        .public();

        let request = CommitEventsRequest::new(
            &call_context(),
            &UncommittedEvents::from(event),
            &EventTypes::new(),
        )
        .unwrap();

        assert_eq!(request.events.len(), 1);
        assert_eq!(request.events[0].event_type, Some((&event_type).into()));
        assert_eq!(request.events[0].content, r#"{"dish":"Taco"}"#);
        assert!(request.events[0].public);
        assert!(request.call_context.is_some());
    }

    #[test]
    fn test_aggregate_request_carries_expected_version() {
        let event_type = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let mut events = UncommittedAggregateEvents::new(
            EventSourceId::generate(),
            AggregateRootId::generate(),
            quill_domain::AggregateRootVersion::new(3),
        );
        events
            .add(UncommittedAggregateEvent::new(json!({"a": 1}), event_type))
            .unwrap();

        let request = CommitAggregateEventsRequest::new(
            &call_context(),
            &events,
            &EventTypes::new(),
        )
        .unwrap();
        let wire = request.events.unwrap();
        assert_eq!(wire.expected_aggregate_root_version, 3);
        assert_eq!(wire.events.len(), 1);
    }
}
