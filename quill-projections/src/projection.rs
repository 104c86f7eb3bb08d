//! Projections
//!
//! A projection folds events into keyed read model instances. It is built
//! once, then shared read-only by the processor and the worker.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quill_domain::protocol::{WireCallContext, WireUuid};
use quill_domain::{CallContext, EventContent, EventType};

use crate::context::ProjectionContext;
use crate::error::{ProjectionError, Result};
use crate::identifiers::{ProjectionId, ScopeId};
use crate::key_selector::KeySelector;
use crate::outcome::ProjectionOutcome;
use crate::protocol::{encode_state, ProjectionRegistrationRequest, WireProjectionEventSelector};

/// Type-erased handler for one event type
pub type ProjectionHandler<R> =
    Arc<dyn Fn(R, &EventContent, &ProjectionContext) -> Result<ProjectionOutcome<R>> + Send + Sync>;

/// Wrap a handler over a typed event.
///
/// Content decoded by the event type registry is used as is; other content
/// is deserialized from its JSON.
pub(crate) fn typed_handler<R, E, F>(event_type: EventType, handler: F) -> ProjectionHandler<R>
where
    R: 'static,
    E: DeserializeOwned + Send + Sync + 'static,
    F: Fn(R, &E, &ProjectionContext) -> ProjectionOutcome<R> + Send + Sync + 'static,
{
    Arc::new(
        move |state: R,
              content: &EventContent,
              context: &ProjectionContext|
              -> Result<ProjectionOutcome<R>> {
            if let Some(event) = content.downcast_ref::<E>() {
                return Ok(handler(state, event, context));
            }
            let event: E =
                content.deserialize().map_err(|e| ProjectionError::InvalidEventContent {
                    event_type: event_type.clone(),
                    reason: e.to_string(),
                })?;
            Ok(handler(state, &event, context))
        },
    )
}

/// Handler and key selector registered for one event type
pub struct ProjectionEventHandler<R> {
    pub key_selector: KeySelector,
    pub handler: ProjectionHandler<R>,
}

/// A built, immutable projection
pub struct Projection<R> {
    projection_id: ProjectionId,
    scope_id: ScopeId,
    initial_state: R,
    events: HashMap<EventType, ProjectionEventHandler<R>>,
}

impl<R> Projection<R>
where
    R: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(
        projection_id: ProjectionId,
        scope_id: ScopeId,
        initial_state: R,
        events: HashMap<EventType, ProjectionEventHandler<R>>,
    ) -> Self {
        Self {
            projection_id,
            scope_id,
            initial_state,
            events,
        }
    }

    pub fn projection_id(&self) -> ProjectionId {
        self.projection_id
    }

    pub fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    pub fn initial_state(&self) -> &R {
        &self.initial_state
    }

    /// Handler registered for an event type
    pub fn handler_for(&self, event_type: &EventType) -> Option<&ProjectionEventHandler<R>> {
        self.events.get(event_type)
    }

    /// Event types this projection handles
    pub fn event_types(&self) -> impl Iterator<Item = &EventType> {
        self.events.keys()
    }

    /// Fold one event into a state.
    ///
    /// # Errors
    /// Returns `ProjectionError::MissingOnMethodForType` if no handler is
    /// registered for the event type.
    pub fn on(
        &self,
        state: R,
        event_type: &EventType,
        content: &EventContent,
        context: &ProjectionContext,
    ) -> Result<ProjectionOutcome<R>> {
        let handler =
            self.handler_for(event_type)
                .ok_or_else(|| ProjectionError::MissingOnMethodForType {
                    projection_id: self.projection_id,
                    event_type: event_type.clone(),
                })?;
        (handler.handler)(state, content, context)
    }

    /// Registration message for the runtime.
    ///
    /// # Errors
    /// Returns `ProjectionError::InvalidState` if the initial state does not
    /// serialize.
    pub fn registration_request(
        &self,
        call_context: &CallContext,
    ) -> Result<ProjectionRegistrationRequest> {
        let mut events: Vec<WireProjectionEventSelector> = self
            .events
            .iter()
            .map(|(event_type, handler)| WireProjectionEventSelector {
                event_type: event_type.into(),
                key_selector: (&handler.key_selector).into(),
            })
            .collect();
        // Stable order on the wire
        events.sort_by(|a, b| {
            (&a.event_type.id.value, a.event_type.generation)
                .cmp(&(&b.event_type.id.value, b.event_type.generation))
        });

        Ok(ProjectionRegistrationRequest {
            call_context: Some(WireCallContext::from(call_context)),
            projection_id: WireUuid::encode(self.projection_id),
            scope_id: WireUuid::encode(self.scope_id),
            initial_state: encode_state(&self.initial_state)?,
            events,
        })
    }
}

impl<R> fmt::Debug for Projection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("projection_id", &self.projection_id)
            .field("scope_id", &self.scope_id)
            .field("event_types", &self.events.keys().collect::<Vec<_>>())
            .finish()
    }
}
