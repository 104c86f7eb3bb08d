//! Projection processor
//!
//! Answers one projection request from the runtime: decode the event and
//! current state, dispatch to the handler for the event type, encode the
//! outcome. Holds no state between requests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use quill_domain::protocol::decode_committed_event;
use quill_domain::{BuildResults, CallContext, EventTypes};

use crate::builder::ProjectionBuilder;
use crate::context::{EventContext, ProjectionContext};
use crate::error::{ProjectionError, Result};
use crate::identifiers::{ProjectionId, ScopeId};
use crate::outcome::ProjectionOutcome;
use crate::projection::Projection;
use crate::protocol::{
    encode_state, CurrentState, CurrentStateType, ProjectionRegistrationRequest, ProjectionRequest,
    ProjectionResponse,
};

/// Progress of a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invocation {
    Pending,
    Dispatched,
    Replaced,
    Deleted,
    Rejected,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invocation::Pending => "pending",
            Invocation::Dispatched => "dispatched",
            Invocation::Replaced => "replaced",
            Invocation::Deleted => "deleted",
            Invocation::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// A projection the worker can register and invoke, whatever its read model type
pub trait ProjectionHandling: Send + Sync {
    fn projection_id(&self) -> ProjectionId;

    fn scope_id(&self) -> ScopeId;

    /// # Errors
    /// Returns `ProjectionError::InvalidState` if the initial state does not
    /// serialize.
    fn registration_request(
        &self,
        call_context: &CallContext,
    ) -> Result<ProjectionRegistrationRequest>;

    /// # Errors
    /// Returns decoding errors, `ProjectionError::MissingOnMethodForType`, or
    /// a handler's content error.
    fn handle(&self, request: ProjectionRequest) -> Result<ProjectionResponse>;
}

/// Processes projection requests for one projection
pub struct ProjectionProcessor<R> {
    projection: Arc<Projection<R>>,
    event_types: Arc<EventTypes>,
}

impl<R> ProjectionProcessor<R>
where
    R: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(projection: Arc<Projection<R>>, event_types: Arc<EventTypes>) -> Self {
        Self {
            projection,
            event_types,
        }
    }

    pub fn projection(&self) -> &Projection<R> {
        &self.projection
    }

    fn trace(&self, invocation: Invocation) {
        debug!(
            projection_id = %self.projection.projection_id(),
            state = %invocation,
            "Projection invocation"
        );
    }

    fn process(&self, request: ProjectionRequest) -> Result<ProjectionResponse> {
        let stream_event = request.event.ok_or(ProjectionError::MissingEvent)?;
        let wire_event = stream_event.event.ok_or(ProjectionError::MissingEvent)?;
        let event = decode_committed_event(wire_event, &self.event_types)?;

        let current = request.current_state.ok_or(ProjectionError::MissingCurrentState)?;
        let current = CurrentState::<R>::decode(current)?;

        let context = ProjectionContext {
            was_created_from_initial_state: current.state_type
                == CurrentStateType::CreatedFromInitialState,
            key: current.key,
            event_context: EventContext {
                sequence_number: event.event_log_sequence_number,
                event_source_id: event.event_source_id,
                occurred: event.occurred,
                execution_context: event.execution_context,
            },
        };

        self.trace(Invocation::Dispatched);
        let outcome = self
            .projection
            .on(current.state, &event.event_type, &event.content, &context)?;

        match outcome {
            ProjectionOutcome::Replace(state) => {
                let state = encode_state(&state)?;
                self.trace(Invocation::Replaced);
                Ok(ProjectionResponse::Replace { state })
            }
            ProjectionOutcome::Delete => {
                self.trace(Invocation::Deleted);
                Ok(ProjectionResponse::Delete)
            }
        }
    }
}

impl<R> ProjectionHandling for ProjectionProcessor<R>
where
    R: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn projection_id(&self) -> ProjectionId {
        self.projection.projection_id()
    }

    fn scope_id(&self) -> ScopeId {
        self.projection.scope_id()
    }

    fn registration_request(
        &self,
        call_context: &CallContext,
    ) -> Result<ProjectionRegistrationRequest> {
        self.projection.registration_request(call_context)
    }

    fn handle(&self, request: ProjectionRequest) -> Result<ProjectionResponse> {
        self.trace(Invocation::Pending);
        self.process(request).inspect_err(|e| {
            debug!(
                projection_id = %self.projection.projection_id(),
                state = %Invocation::Rejected,
                error = %e,
                "Projection invocation"
            );
        })
    }
}

/// A projection builder with its read model type erased
pub trait BuildProjection: Send {
    fn projection_id(&self) -> ProjectionId;

    /// Build a processor, recording problems in `results`
    fn build_processor(
        self: Box<Self>,
        event_types: Arc<EventTypes>,
        results: &mut BuildResults,
    ) -> Option<Arc<dyn ProjectionHandling>>;
}

impl<R> BuildProjection for ProjectionBuilder<R>
where
    R: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn projection_id(&self) -> ProjectionId {
        ProjectionBuilder::projection_id(self)
    }

    fn build_processor(
        self: Box<Self>,
        event_types: Arc<EventTypes>,
        results: &mut BuildResults,
    ) -> Option<Arc<dyn ProjectionHandling>> {
        let projection = (*self).build(&event_types, results)?;
        Some(Arc::new(ProjectionProcessor::new(Arc::new(projection), event_types)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_selector::KeySelector;
    use crate::protocol::{WireProjectionCurrentState, WireStreamEvent};
    use chrono::Utc;
    use quill_domain::protocol::{encode_committed_event, WireUuid};
    use quill_domain::{
        CommittedEvent, EventContent, EventLogSequenceNumber, EventSourceId, EventType, EventTypeId,
        ExecutionContext, Generation, MicroserviceId, TenantId, Version,
    };
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Kitchen {
        dishes_prepared: u32,
    }

    #[derive(Debug, Deserialize)]
    struct DishPrepared {}

    #[derive(Debug, Deserialize)]
    struct KitchenClosed {}

    struct Fixture {
        dish_prepared: EventType,
        kitchen_closed: EventType,
        processor: ProjectionProcessor<Kitchen>,
    }

    fn fixture() -> Fixture {
        let dish_prepared = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let kitchen_closed = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let mut results = BuildResults::new();
        let projection = ProjectionBuilder::<Kitchen>::new(ProjectionId::generate())
            .on(
                dish_prepared.clone(),
                KeySelector::EventSourceId,
                |mut kitchen: Kitchen, _: &DishPrepared, _| {
                    kitchen.dishes_prepared += 1;
                    ProjectionOutcome::Replace(kitchen)
                },
            )
            .on(kitchen_closed.clone(), KeySelector::EventSourceId, |_, _: &KitchenClosed, _| {
                ProjectionOutcome::Delete
            })
            .build(&EventTypes::new(), &mut results)
            .unwrap();

        Fixture {
            dish_prepared,
            kitchen_closed,
            processor: ProjectionProcessor::new(Arc::new(projection), Arc::new(EventTypes::new())),
        }
    }

    fn request(event_type: &EventType, state: Option<&str>) -> ProjectionRequest {
        let event = CommittedEvent {
            event_log_sequence_number: EventLogSequenceNumber::new(3),
            occurred: Utc::now(),
            event_source_id: EventSourceId::generate(),
            execution_context: ExecutionContext::new(
                MicroserviceId::generate(),
                TenantId::generate(),
                Version::new(1, 0, 0),
                "Development",
            ),
            event_type: event_type.clone(),
            content: EventContent::from(json!({})),
            is_public: false,
            is_external: false,
            external_event_log_sequence_number: EventLogSequenceNumber::FIRST,
            external_event_received: Utc::now(),
        };

        ProjectionRequest {
            current_state: Some(WireProjectionCurrentState {
                state_type: if state.is_some() {
                    CurrentStateType::Persisted
                } else {
                    CurrentStateType::CreatedFromInitialState
                },
                key: "kitchen".to_string(),
                state: state.unwrap_or(r#"{"dishes_prepared":0}"#).to_string(),
            }),
            event: Some(WireStreamEvent {
                event: Some(encode_committed_event(&event)),
                partition_id: "kitchen".to_string(),
                scope_id: WireUuid::encode(ScopeId::DEFAULT),
            }),
            retry_count: 0,
        }
    }

    #[test]
    fn test_replace_from_initial_state() {
        let fixture = fixture();
        let response = fixture.processor.handle(request(&fixture.dish_prepared, None)).unwrap();
        assert_eq!(
            response,
            ProjectionResponse::Replace {
                state: r#"{"dishes_prepared":1}"#.to_string()
            }
        );
    }

    #[test]
    fn test_replace_from_persisted_state() {
        let fixture = fixture();
        let response = fixture
            .processor
            .handle(request(&fixture.dish_prepared, Some(r#"{"dishes_prepared":41}"#)))
            .unwrap();
        assert_eq!(
            response,
            ProjectionResponse::Replace {
                state: r#"{"dishes_prepared":42}"#.to_string()
            }
        );
    }

    #[test]
    fn test_delete() {
        let fixture = fixture();
        let response = fixture.processor.handle(request(&fixture.kitchen_closed, None)).unwrap();
        assert_eq!(response, ProjectionResponse::Delete);
    }

    #[test]
    fn test_unhandled_event_type_is_missing_on_method() {
        let fixture = fixture();
        let unknown = EventType::new(EventTypeId::generate(), Generation::FIRST);
        let error = fixture.processor.handle(request(&unknown, None)).unwrap_err();

        assert!(error.is_fatal());
        assert_eq!(
            error,
            ProjectionError::MissingOnMethodForType {
                projection_id: fixture.processor.projection_id(),
                event_type: unknown,
            }
        );
    }

    #[test]
    fn test_missing_current_state() {
        let fixture = fixture();
        let mut request = request(&fixture.dish_prepared, None);
        request.current_state = None;
        assert_eq!(
            fixture.processor.handle(request),
            Err(ProjectionError::MissingCurrentState)
        );
    }

    #[test]
    fn test_malformed_state_is_rejected() {
        let fixture = fixture();
        let error = fixture
            .processor
            .handle(request(&fixture.dish_prepared, Some("[1,2]")))
            .unwrap_err();
        assert!(matches!(error, ProjectionError::InvalidState(_)));
        assert!(!error.is_fatal());
    }
}
